//! ragline gateway entry point
//!
//! Loads configuration from an optional file plus `RAGLINE_*` environment
//! overrides (`RAGLINE_SERVER__PORT=9000`) and serves the HTTP API.

use clap::Parser;
use ragline_gateway::{AppState, GatewayServer};
use ragline_kernel::config::RaglineConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ragline-gateway", version, about = "Retrieval-and-rerank RAG service")]
struct Args {
    /// Configuration file (yaml, toml, json, ini, ron or json5)
    #[arg(short, long, env = "RAGLINE_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ragline_gateway=info,ragline_foundation=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = match RaglineConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    info!(
        host = %config.server.host,
        port = config.server.port,
        data_dir = %config.storage.data_dir.display(),
        "ragline configuration loaded"
    );

    let state = match AppState::from_config(config).await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Startup error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = GatewayServer::new(state).start().await {
        eprintln!("Gateway error: {e}");
        std::process::exit(1);
    }
}
