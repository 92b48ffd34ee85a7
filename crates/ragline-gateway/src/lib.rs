//! `ragline-gateway`: HTTP surface for the ragline pipeline.
//!
//! Wires the ragline-foundation components into an axum service:
//! upload and process documents, backfill embeddings, retrieve with
//! reranking, and generate answers (whole or streamed).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ragline_gateway::server::GatewayServer;
//! use ragline_gateway::state::AppState;
//! use ragline_kernel::config::RaglineConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RaglineConfig::load(None)?;
//!     let state = AppState::from_config(config).await?;
//!     GatewayServer::new(state).start().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::{GatewayError, GatewayResult};
pub use server::{GatewayServer, build_router};
pub use state::{AppState, ModelLister};
