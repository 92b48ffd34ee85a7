//! Answer generation endpoints
//!
//! POST /generate        - whole answer plus token metrics
//! POST /generate/stream - server-sent events, one per increment, then a summary

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use ragline_kernel::rag::{GenerationOutput, GenerationRequest};
use serde_json::json;
use tracing::warn;

use crate::error::GatewayResult;
use crate::state::AppState;

/// POST /generate
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerationRequest>,
) -> GatewayResult<Json<GenerationOutput>> {
    Ok(Json(state.generator.generate(&req).await?))
}

/// POST /generate/stream
///
/// A backend error after the stream has started is sent as an `error` event
/// and ends the stream.
pub async fn generate_stream(
    State(state): State<AppState>,
    Json(req): Json<GenerationRequest>,
) -> GatewayResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let events = state.generator.stream(req).await?;
    let sse = events.map(|event| match event {
        Ok(event) => Event::default().json_data(event),
        Err(e) => {
            warn!(error = %e, "generation stream failed");
            Event::default()
                .event("error")
                .json_data(json!({ "error": e.to_string() }))
        }
    });
    Ok(Sse::new(sse).keep_alive(KeepAlive::default()))
}

pub fn generate_router() -> axum::Router<AppState> {
    use axum::routing::post;
    axum::Router::new()
        .route("/generate", post(generate))
        .route("/generate/stream", post(generate_stream))
}
