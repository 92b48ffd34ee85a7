//! Axum HTTP server
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check |
//! | `GET`  | `/models` | Installed models, split by purpose |
//! | `POST` | `/reset` | Drop all chunks and uploads |
//! | `POST` | `/upload` | Store a document (multipart `file`) |
//! | `POST` | `/process` | Extract and segment an upload into pending chunks |
//! | `POST` | `/embed` | Backfill vectors for pending chunks |
//! | `POST` | `/retrieve` | Search and rerank |
//! | `POST` | `/generate` | Answer from context |
//! | `POST` | `/generate/stream` | Answer as server-sent events |

use crate::handlers::{
    documents_router, embed_router, generate_router, health_router, retrieve_router,
};
use crate::state::AppState;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the full router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health_router())
        .merge(documents_router())
        .merge(embed_router())
        .merge(retrieve_router())
        .merge(generate_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct GatewayServer {
    state: AppState,
}

impl GatewayServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Bind to the configured host and port and serve until Ctrl-C.
    pub async fn start(self) -> std::io::Result<()> {
        let addr = format!(
            "{}:{}",
            self.state.config.server.host, self.state.config.server.port
        );
        let app = build_router(self.state);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %addr, "ragline gateway listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
