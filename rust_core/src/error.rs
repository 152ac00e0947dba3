//! Error types shared by the relay.
//!
//! Failures are layered:
//! - `FetchError` describes one failed upstream attempt
//! - `UpstreamError` is what remains after the retry policy gives up
//! - `CommandError` covers lines the router cannot turn into a command
//! - `RelayError` is the per-request taxonomy every reply is built from

use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// A single failed attempt against the upstream provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("rate limited by upstream")]
    RateLimited { retry_after: Option<Duration> },

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode upstream body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Timeouts, connection failures, 5xx and rate limiting are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Connect(_) | FetchError::RateLimited { .. } => {
                true
            }
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Decode(_) => false,
        }
    }

    /// Delay the provider asked for, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status associated with the failure, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

/// Final outcome of a fetch once retries are exhausted or pointless.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream unavailable after {attempts} attempt(s): {last}")]
    Unavailable { attempts: u32, last: FetchError },

    #[error("upstream returned an unexpected body: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub(crate) fn from_attempt(last: FetchError, attempts: u32) -> Self {
        match last {
            FetchError::Decode(msg) => UpstreamError::Decode(msg),
            last => UpstreamError::Unavailable { attempts, last },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Unavailable { last, .. } => last.status(),
            UpstreamError::Decode(_) => None,
        }
    }
}

/// Reasons a command line could not be turned into an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command")]
    Unknown(String),

    #[error("Missing argument <{argument}> for '{command}'")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Invalid argument <{argument}> for '{command}': {value:?}")]
    InvalidArgument {
        command: &'static str,
        argument: &'static str,
        value: String,
    },
}

/// Per-request failure taxonomy.
///
/// Only `Transport` ends a connection; everything else is turned into a JSON
/// error object and the connection keeps serving.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    MalformedCommand(#[from] CommandError),
}

impl RelayError {
    /// Stable identifier sent to clients in the `kind` field.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Transport(_) => "transport",
            RelayError::Upstream(_) => "upstream_unavailable",
            RelayError::MalformedCommand(CommandError::Unknown(_)) => "unknown_command",
            RelayError::MalformedCommand(_) => "malformed_command",
        }
    }

    /// JSON error reply: `{error: true, kind, message}` plus the upstream status when known.
    pub fn to_reply(&self) -> Value {
        let mut reply = json!({
            "error": true,
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let RelayError::Upstream(err) = self {
            if let Some(status) = err.status() {
                reply["status"] = json!(status);
            }
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout(Duration::from_secs(10)).is_transient());
        assert!(FetchError::Connect("refused".into()).is_transient());
        assert!(FetchError::RateLimited { retry_after: None }.is_transient());
        assert!(FetchError::Status { status: 503, body: String::new() }.is_transient());

        assert!(!FetchError::Status { status: 404, body: String::new() }.is_transient());
        assert!(!FetchError::Status { status: 403, body: String::new() }.is_transient());
        assert!(!FetchError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn test_decode_failure_becomes_upstream_decode() {
        let err = UpstreamError::from_attempt(FetchError::Decode("not json".into()), 1);
        assert_eq!(err, UpstreamError::Decode("not json".into()));

        let reply = RelayError::from(err).to_reply();
        assert_eq!(reply["kind"], "upstream_unavailable");
    }

    #[test]
    fn test_unknown_command_reply_shape() {
        let reply = RelayError::from(CommandError::Unknown("fixtures".into())).to_reply();
        assert_eq!(reply["error"], true);
        assert_eq!(reply["kind"], "unknown_command");
        assert_eq!(reply["message"], "Unknown command");
    }

    #[test]
    fn test_upstream_reply_carries_status() {
        let err = UpstreamError::Unavailable {
            attempts: 1,
            last: FetchError::Status { status: 404, body: "not found".into() },
        };
        let reply = RelayError::from(err).to_reply();
        assert_eq!(reply["status"], 404);
        assert_eq!(reply["kind"], "upstream_unavailable");
    }
}
