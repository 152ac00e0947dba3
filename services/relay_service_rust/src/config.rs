//! Configuration constants and environment loading for the relay
//!
//! This module manages all runtime configuration:
//! - Listening addresses for the TCP command server and UDP chat relay
//! - Upstream provider URL, token, timeout and retry policy
//! - Per-operation cache lifetimes and the expired-entry sweep interval
//! - Chat liveness window and heartbeat prefix

use football_hub_core::chat::HEARTBEAT_PREFIX;
use football_hub_core::clients::football_data::DEFAULT_BASE_URL;
use football_hub_core::router::{DEFAULT_MATCH_DAYS, MAX_MATCH_DAYS};
use football_hub_core::{Backoff, CacheTtls, RetryPolicy, RouterConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default TCP command address (matches the desktop client)
pub const DEFAULT_TCP_ADDR: &str = "127.0.0.1:65432";

/// Default UDP chat address
pub const DEFAULT_UDP_ADDR: &str = "127.0.0.1:12345";

pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_UPSTREAM_BASE_BACKOFF_MS: u64 = 1000;
pub const DEFAULT_UPSTREAM_MAX_BACKOFF_MS: u64 = 10_000;

/// How often expired cache entries nobody asked for again are dropped
pub const DEFAULT_CACHE_SWEEP_SECS: u64 = 60;

/// Clients heartbeat every 5s; three missed beats mark a peer gone
pub const DEFAULT_CHAT_LIVENESS_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub tcp_addr: String,
    pub udp_addr: String,

    pub upstream_url: String,
    pub api_key: Option<String>,
    pub upstream_timeout: Duration,
    pub retry_policy: RetryPolicy,

    pub cache_sweep_interval: Duration,
    pub router: RouterConfig,

    pub chat_liveness: Duration,
    pub heartbeat_prefix: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            tcp_addr: DEFAULT_TCP_ADDR.to_string(),
            udp_addr: DEFAULT_UDP_ADDR.to_string(),
            upstream_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            retry_policy: RetryPolicy {
                max_attempts: DEFAULT_UPSTREAM_MAX_ATTEMPTS,
                base_delay: Duration::from_millis(DEFAULT_UPSTREAM_BASE_BACKOFF_MS),
                max_delay: Duration::from_millis(DEFAULT_UPSTREAM_MAX_BACKOFF_MS),
                backoff: Backoff::Linear,
            },
            cache_sweep_interval: Duration::from_secs(DEFAULT_CACHE_SWEEP_SECS),
            router: RouterConfig::default(),
            chat_liveness: Duration::from_secs(DEFAULT_CHAT_LIVENESS_SECS),
            heartbeat_prefix: HEARTBEAT_PREFIX.to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ttl_defaults = CacheTtls::default();

        let retry_policy = RetryPolicy {
            max_attempts: env_parse("UPSTREAM_MAX_ATTEMPTS", DEFAULT_UPSTREAM_MAX_ATTEMPTS).max(1),
            base_delay: Duration::from_millis(env_parse(
                "UPSTREAM_BASE_BACKOFF_MS",
                DEFAULT_UPSTREAM_BASE_BACKOFF_MS,
            )),
            max_delay: Duration::from_millis(env_parse(
                "UPSTREAM_MAX_BACKOFF_MS",
                DEFAULT_UPSTREAM_MAX_BACKOFF_MS,
            )),
            backoff: Backoff::Linear,
        };

        let router = RouterConfig {
            ttls: CacheTtls {
                matches: env_secs("CACHE_TTL_MATCHES_SECS", ttl_defaults.matches),
                standings: env_secs("CACHE_TTL_STANDINGS_SECS", ttl_defaults.standings),
                scorers: env_secs("CACHE_TTL_SCORERS_SECS", ttl_defaults.scorers),
                team: env_secs("CACHE_TTL_TEAM_SECS", ttl_defaults.team),
                player: env_secs("CACHE_TTL_PLAYER_SECS", ttl_defaults.player),
            },
            default_match_days: env_parse("MATCHES_DEFAULT_DAYS", DEFAULT_MATCH_DAYS),
            max_match_days: env_parse("MATCHES_MAX_DAYS", MAX_MATCH_DAYS),
        };

        Self {
            tcp_addr: env::var("RELAY_TCP_ADDR").unwrap_or(defaults.tcp_addr),
            udp_addr: env::var("RELAY_UDP_ADDR").unwrap_or(defaults.udp_addr),
            upstream_url: env::var("FOOTBALL_DATA_URL").unwrap_or(defaults.upstream_url),
            api_key: env::var("FOOTBALL_DATA_API_KEY").ok().filter(|k| !k.is_empty()),
            upstream_timeout: env_secs("UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout),
            retry_policy,
            cache_sweep_interval: env_secs("CACHE_SWEEP_SECS", defaults.cache_sweep_interval)
                .max(Duration::from_secs(1)),
            router,
            chat_liveness: env_secs("CHAT_LIVENESS_SECS", defaults.chat_liveness),
            heartbeat_prefix: env::var("CHAT_HEARTBEAT_PREFIX")
                .ok()
                .filter(|p| !p.is_empty())
                .unwrap_or(defaults.heartbeat_prefix),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
