//! Bounded retry for upstream requests
//!
//! Provides automatic retry with increasing backoff for transient provider failures.

use crate::error::{FetchError, UpstreamError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `attempt × base_delay`
    Linear,
    /// `base_delay × 2^(attempt - 1)`
    Exponential,
}

/// Retry configuration for upstream calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound on any single delay, including provider-requested ones
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            backoff: Backoff::Linear,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after `attempt` (1-based) failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let delay = match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::Exponential => self
                .base_delay
                .saturating_mul(2_u32.saturating_pow(attempt - 1)),
        };
        delay.min(self.max_delay)
    }

    /// Upper bound on the total time spent sleeping between attempts.
    pub fn max_total_delay(&self) -> Duration {
        self.max_delay
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }

    /// Run `f` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `f` receives the 1-based attempt number. A rate-limit response with a
    /// `Retry-After` hint replaces the computed delay, still capped at `max_delay`.
    ///
    /// # Example
    /// ```ignore
    /// let payload = policy
    ///     .run("competitions/PL/standings", |_| transport.get_json(path, &params))
    ///     .await?;
    /// ```
    pub async fn run<F, Fut, T>(&self, label: &str, mut f: F) -> Result<T, UpstreamError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f(attempt).await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < max_attempts && e.is_transient() => {
                    let delay = e
                        .retry_after()
                        .map(|d| d.min(self.max_delay))
                        .unwrap_or_else(|| self.delay_for(attempt));
                    warn!(
                        "Upstream request {} failed (attempt {}/{}): {}. Retrying in {}ms",
                        label,
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        "Upstream request {} gave up after {} attempt(s): {}",
                        label, attempt, e
                    );
                    return Err(UpstreamError::from_attempt(e, attempt));
                }
            }
        }
    }
}
