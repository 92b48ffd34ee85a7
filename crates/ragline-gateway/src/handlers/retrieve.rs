//! Retrieval endpoint
//!
//! POST /retrieve - embed the query, search, rerank and return the top chunks

use axum::{Json, extract::State};
use ragline_foundation::rag::RetrieveRequest;
use ragline_kernel::rag::{RetrievalMetrics, RetrievalResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RetrieveBody {
    pub query: String,
    pub embedding_model: Option<String>,
    pub reranker_model: Option<String>,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub results: Vec<RetrievalResult>,
    pub metrics: RetrievalMetrics,
}

/// POST /retrieve
pub async fn retrieve(
    State(state): State<AppState>,
    Json(body): Json<RetrieveBody>,
) -> GatewayResult<Json<RetrieveResponse>> {
    if body.query.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("query must not be empty".into()));
    }

    let config = &state.config;
    let mut request = RetrieveRequest::new(
        body.query,
        body.embedding_model
            .unwrap_or_else(|| config.embedding.default_model.clone()),
        body.reranker_model
            .unwrap_or_else(|| config.reranker.default_model.clone()),
        body.top_k.unwrap_or(config.retrieval.default_top_k),
    );
    if let Some(ms) = config.retrieval.deadline_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }

    let (results, metrics) = state.retrieval.retrieve(&request).await?;
    Ok(Json(RetrieveResponse { results, metrics }))
}

pub fn retrieve_router() -> axum::Router<AppState> {
    use axum::routing::post;
    axum::Router::new().route("/retrieve", post(retrieve))
}
