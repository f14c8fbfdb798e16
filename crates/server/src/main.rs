//! spasi-sw server entry point.
//!
//! Boots the offline cache worker host and serves it as an MCP server on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use spasi_client::{FetchClient, FetchConfig};
use spasi_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let worker = config.worker_config()?;

    tracing::info!(cache = %config.cache_name, origin = %config.origin, "Starting spasi-sw server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_app(&config)?)?;
    let state = Arc::new(state::AppState::new(config, Arc::new(db), Arc::new(network)));

    // The host retries a failed install on the next sw_update.
    if let Err(e) = state.registration.update(worker).await {
        tracing::warn!(error = %e, "initial install failed");
    }

    let handler = handler::SwServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
