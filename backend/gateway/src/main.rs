//! Crowdfunding ledger gateway: entry point.
//!
//! Hosts the crowdfunding contract on a single-node ledger. Invocations are
//! simulated against the committed world state, validated for read conflicts
//! and committed one per block to SQLite. A small Axum REST API accepts
//! submissions and queries and serves the transaction log.

mod api;
mod config;
mod contract;
mod db;
mod errors;
mod peer;
mod world_state;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use peer::Peer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    let peer = Peer::open(pool, config.clone()).await?;
    let app = api::router(Arc::new(api::ApiState { peer }));

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!(
        channel = %config.channel_name,
        chaincode = %config.chaincode_name,
        "API listening on http://{addr}"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
