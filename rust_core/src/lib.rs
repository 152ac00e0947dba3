//! Football Hub Core - caching relay between desktop clients and football-data.org.
//!
//! This module provides:
//! - Time-bounded response cache keyed by request fingerprints
//! - Upstream fetching with per-attempt timeout and bounded retry
//! - Line-oriented command parsing and routing to JSON replies
//! - Competition catalogue for the codes the client offers
//! - Chat presence tracking and datagram classification for the UDP relay

pub mod cache;
pub mod chat;
pub mod clients;
pub mod command;
pub mod competitions;
pub mod error;
pub mod fingerprint;
pub mod presence;
pub mod router;
pub mod upstream;

pub use cache::{CacheStats, ResponseCache};
pub use chat::Datagram;
pub use command::{Command, DataCommand, PendingRequest};
pub use error::{CommandError, FetchError, RelayError, UpstreamError};
pub use fingerprint::Fingerprint;
pub use presence::PresenceTable;
pub use router::{CacheTtls, CommandRouter, Reply, RouterConfig};
pub use upstream::{Backoff, RetryPolicy, UpstreamFetcher, UpstreamTransport};
