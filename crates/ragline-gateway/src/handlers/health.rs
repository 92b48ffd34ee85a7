//! Liveness and model listing
//!
//! GET /health - liveness probe
//! GET /models - installed models split into embedding and generation models

use axum::{Json, extract::State, response::IntoResponse};
use ragline_foundation::llm::ModelCatalog;
use serde_json::json;

use crate::error::GatewayResult;
use crate::state::AppState;

/// GET /health - always 200 while the process is alive
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /models
pub async fn models(State(state): State<AppState>) -> GatewayResult<Json<ModelCatalog>> {
    Ok(Json(state.models.catalog().await?))
}

pub fn health_router() -> axum::Router<AppState> {
    use axum::routing::get;
    axum::Router::new()
        .route("/health", get(health))
        .route("/models", get(models))
}
