//! football-data.org HTTP transport
//!
//! One instance is shared by every connection. Each call is a single GET with
//! the client-wide timeout; retrying is left to `UpstreamFetcher`.

use crate::error::FetchError;
use crate::upstream::UpstreamTransport;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.football-data.org/v4";

/// Seconds until the provider's request counter resets.
const REQUEST_COUNTER_RESET: &str = "x-requestcounter-reset";

/// Keep error bodies short in logs and replies.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Clone)]
pub struct FootballDataClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for FootballDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FootballDataClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FootballDataClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent("FootballHub/1.0")
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify_send_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Connect(e.to_string())
        }
    }
}

#[async_trait]
impl UpstreamTransport for FootballDataClient {
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError> {
        let url = self.url(path);
        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("X-Auth-Token", key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;
        let status = resp.status();
        debug!("football-data {} -> {}", url, status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                retry_after: parse_retry_after(resp.headers()),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        if !data.is_object() {
            return Err(FetchError::Decode(format!(
                "expected a JSON object from {}, got {}",
                path,
                json_type(&data)
            )));
        }

        Ok(data)
    }
}

/// Delay hint from `Retry-After`, falling back to the provider's counter reset header.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    [RETRY_AFTER.as_str(), REQUEST_COUNTER_RESET]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .find_map(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
