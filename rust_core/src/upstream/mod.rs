//! Upstream data provider access.
//!
//! `UpstreamTransport` is the seam: one attempt, one HTTP GET, one classified
//! result. `UpstreamFetcher` wraps a transport with a `RetryPolicy` and is the
//! only thing the router talks to.

pub mod retry;

use crate::error::{FetchError, UpstreamError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub use retry::{Backoff, RetryPolicy};

/// Performs a single request against the provider.
///
/// Implementations decide what counts as success (status codes, body shape)
/// and must return promptly: each call is expected to be bounded by its own
/// timeout.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError>;
}

/// Retrying fetcher shared by every connection handler.
#[derive(Clone)]
pub struct UpstreamFetcher {
    transport: Arc<dyn UpstreamTransport>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for UpstreamFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamFetcher")
            .field("policy", &self.policy)
            .finish()
    }
}

impl UpstreamFetcher {
    pub fn new(transport: Arc<dyn UpstreamTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetch `path` with `query`, retrying transient failures per the policy.
    pub async fn fetch(&self, path: &str, query: &[(String, String)]) -> Result<Value, UpstreamError> {
        let transport = &self.transport;
        self.policy
            .run(path, move |attempt| {
                debug!("Calling upstream {} (attempt {})", path, attempt);
                transport.get_json(path, query)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails a fixed number of times, then succeeds.
    struct FlakyTransport {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl UpstreamTransport for FlakyTransport {
        async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures_before_success {
                return Err(FetchError::Connect("connection reset".into()));
            }
            Ok(json!({ "path": path, "params": query.len() }))
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff: Backoff::Linear,
        }
    }

    #[tokio::test]
    async fn test_fetch_recovers_from_transient_failures() {
        let transport = Arc::new(FlakyTransport {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
        });
        let fetcher = UpstreamFetcher::new(transport.clone(), policy());

        let query = vec![("dateFrom".to_string(), "2026-10-16".to_string())];
        let value = fetcher.fetch("competitions/PL/matches", &query).await.unwrap();
        assert_eq!(value["path"], "competitions/PL/matches");
        assert_eq!(value["params"], 1);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_returns_value_error_when_exhausted() {
        let transport = Arc::new(FlakyTransport {
            failures_before_success: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let fetcher = UpstreamFetcher::new(transport.clone(), policy());

        let err = fetcher.fetch("teams/57", &[]).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable { attempts: 3, .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }
}
