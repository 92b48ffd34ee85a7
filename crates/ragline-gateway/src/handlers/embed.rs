//! Embedding backfill endpoint
//!
//! POST /embed - embed every chunk still carrying a placeholder vector

use axum::{Json, extract::State};
use ragline_kernel::rag::{BackfillFailure, BackfillMetrics};
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    /// Defaults to `embedding.default_model`
    pub embedding_model: Option<String>,
    /// Defaults to `backfill.batch_size`
    pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EmbedResponse {
    NoUpdatesNeeded {
        count: usize,
    },
    Success {
        count: usize,
        failed: Vec<BackfillFailure>,
        metrics: BackfillMetrics,
    },
}

/// POST /embed
pub async fn embed(
    State(state): State<AppState>,
    Json(req): Json<EmbedRequest>,
) -> GatewayResult<Json<EmbedResponse>> {
    let model = req
        .embedding_model
        .unwrap_or_else(|| state.config.embedding.default_model.clone());
    let batch_size = req.batch_size.unwrap_or(state.config.backfill.batch_size);

    let report = state.backfill.backfill(&model, batch_size).await?;
    if report.is_noop() {
        return Ok(Json(EmbedResponse::NoUpdatesNeeded { count: 0 }));
    }

    Ok(Json(EmbedResponse::Success {
        count: report.updated_count(),
        failed: report.failed,
        metrics: report.metrics,
    }))
}

pub fn embed_router() -> axum::Router<AppState> {
    use axum::routing::post;
    axum::Router::new().route("/embed", post(embed))
}
