//! showbell worker entry point.
//!
//! Boots the worker and serves its event tools over stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use showbell_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod platform;
mod runtime;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db = %config.db_path.display(), origin = %config.app_origin, "Starting showbell worker on stdio transport");

    let worker = Arc::new(runtime::Worker::from_config(config).await?);
    let handler = handler::ShowbellWorker::new(worker.clone());
    let server = serve_server(handler, stdio()).await?;

    tokio::select! {
        result = server.waiting() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
        }
    }

    worker.shutdown().await;
    Ok(())
}
