//! offline-agent server entry point.
//!
//! Boots one offline agent, runs its install and activate phases, then serves
//! it over the MCP stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use offline_client::{Agent, FetchClient, FetchConfig, Network};
use offline_core::{AgentConfig, CacheDb, CacheStore};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AgentConfig::load()?;
    tracing::info!(version = %config.version_tag, origin = %config.origin, "starting offline-agent on stdio transport");

    let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open(&config.db_path).await?);
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let agent = Arc::new(Agent::new(&config, store, Arc::clone(&network))?);

    let installed = agent.install().await;
    tracing::info!(cached = installed.cached.len(), failed = installed.failed.len(), "install finished");

    let activated = agent.activate().await;
    tracing::info!(deleted = activated.deleted.len(), "activation finished");

    let handler = handler::OfflineAgentServer::new(Arc::clone(&agent), network);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    agent.retire();
    tracing::info!("offline-agent stopped");

    Ok(())
}
