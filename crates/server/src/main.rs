//! swcache server entry point.
//!
//! Loads configuration, opens the cache store, builds the worker for the
//! configured cache version and serves the MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig, ServiceWorker, WorkerConfig};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let cache = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let fetcher = FetchClient::new(FetchConfig::from(&config)).context("building HTTP client")?;
    let worker_config = WorkerConfig::from_app_config(&config).context("building worker config")?;

    tracing::info!(
        generation = %worker_config.version,
        origin = %worker_config.origin,
        manifest = worker_config.manifest.len(),
        "Starting swcache server on stdio transport"
    );

    let worker = ServiceWorker::new(worker_config, Arc::new(cache.clone()), Arc::new(fetcher));
    let handler = handler::SwCacheServer::new(Arc::new(worker), cache);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
