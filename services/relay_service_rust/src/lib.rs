//! Football Hub relay service
//!
//! - `server`: TCP command server, one task per connection
//! - `chat_relay`: UDP chat fan-out with heartbeat presence
//! - `config`: environment-driven configuration

pub mod chat_relay;
pub mod config;
pub mod server;

use anyhow::Result;
use config::RelayConfig;
use football_hub_core::clients::football_data::FootballDataClient;
use football_hub_core::{CommandRouter, ResponseCache, UpstreamFetcher, UpstreamTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub use chat_relay::ChatRelay;
pub use server::ConnectionServer;

/// Both listeners, bound and ready to run, plus the cache they share.
pub struct RelayService {
    pub server: ConnectionServer,
    pub chat: ChatRelay,
    pub cache: Arc<ResponseCache>,
}

impl RelayService {
    /// Bind with the football-data.org transport.
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        let transport = FootballDataClient::new(
            &config.upstream_url,
            config.api_key.clone(),
            config.upstream_timeout,
        );
        info!("Upstream provider: {}", transport.base_url());
        Self::bind_with_transport(config, Arc::new(transport)).await
    }

    /// Bind with any transport. Either bind failing aborts before traffic is accepted.
    pub async fn bind_with_transport(
        config: &RelayConfig,
        transport: Arc<dyn UpstreamTransport>,
    ) -> Result<Self> {
        let fetcher = Arc::new(UpstreamFetcher::new(transport, config.retry_policy.clone()));
        let cache = Arc::new(ResponseCache::new());
        let router = Arc::new(CommandRouter::new(
            cache.clone(),
            fetcher,
            config.router.clone(),
        ));

        let server = ConnectionServer::bind(&config.tcp_addr, router).await?;
        let chat = ChatRelay::bind(
            &config.udp_addr,
            config.chat_liveness,
            &config.heartbeat_prefix,
        )
        .await?;

        Ok(Self {
            server,
            chat,
            cache,
        })
    }
}

/// Periodically drop expired entries that were never read again.
pub async fn sweep_expired(cache: Arc<ResponseCache>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let removed = cache.purge_expired();
        if removed > 0 {
            debug!("Swept {} expired cache entries ({} left)", removed, cache.len());
        }
    }
}
