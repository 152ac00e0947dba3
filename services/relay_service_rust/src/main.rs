//! Football Hub Relay Service
//!
//! Sits between the desktop clients and football-data.org.
//!
//! This service:
//! - Serves line-based data commands over TCP with a JSON reply per command
//! - Caches provider responses with per-operation lifetimes
//! - Retries transient provider failures with bounded backoff
//! - Relays UDP chat lines to every live peer, tracked by heartbeats

use anyhow::Result;
use dotenv::dotenv;
use relay_service_rust::config::RelayConfig;
use relay_service_rust::{sweep_expired, RelayService};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("[STARTING] Football Hub relay is starting...");

    let config = RelayConfig::from_env();
    if config.api_key.is_none() {
        warn!("FOOTBALL_DATA_API_KEY not set; upstream requests will be anonymous");
    }

    let RelayService {
        server,
        chat,
        cache,
    } = RelayService::bind(&config).await?;

    let tasks = vec![
        tokio::spawn(server.run()),
        tokio::spawn(chat.run()),
        tokio::spawn(sweep_expired(cache, config.cache_sweep_interval)),
    ];

    // Wait for signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    for task in tasks {
        task.abort();
    }

    Ok(())
}
