//! Command routing: line in, JSON reply out.
//!
//! Data commands follow the same path:
//! 1. Build the upstream request and its fingerprint
//! 2. Return the cached payload if one is live
//! 3. Otherwise fetch (no lock held), store with the operation's TTL, reply
//!
//! Every failure becomes a JSON error body; the router never asks the
//! connection to close except for `quit`.

use crate::cache::ResponseCache;
use crate::command::{Command, DataCommand};
use crate::competitions::{canonical_competition, catalogue_json};
use crate::error::{RelayError, UpstreamError};
use crate::fingerprint::Fingerprint;
use crate::upstream::UpstreamFetcher;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default look-ahead for `matches` when the client gives no window.
pub const DEFAULT_MATCH_DAYS: u32 = 30;

/// Largest window forwarded upstream; bigger requests are clamped.
pub const MAX_MATCH_DAYS: u32 = 90;

/// Cache lifetime per operation. Live match data goes stale fast,
/// competition and squad metadata hardly changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTtls {
    pub matches: Duration,
    pub standings: Duration,
    pub scorers: Duration,
    pub team: Duration,
    pub player: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            matches: Duration::from_secs(60),
            standings: Duration::from_secs(300),
            scorers: Duration::from_secs(300),
            team: Duration::from_secs(3600),
            player: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub ttls: CacheTtls,
    pub default_match_days: u32,
    pub max_match_days: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            ttls: CacheTtls::default(),
            default_match_days: DEFAULT_MATCH_DAYS,
            max_match_days: MAX_MATCH_DAYS,
        }
    }
}

/// What the connection should do with a routed command.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub body: Arc<Value>,
    /// Close the connection after sending `body`
    pub close: bool,
}

impl Reply {
    fn send(body: impl Into<Arc<Value>>) -> Self {
        Self {
            body: body.into(),
            close: false,
        }
    }

    fn error(err: RelayError) -> Self {
        Self::send(err.to_reply())
    }

    pub fn is_error(&self) -> bool {
        self.body.get("error").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Resolved upstream call for a data command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub fingerprint: Fingerprint,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub ttl: Duration,
}

pub struct CommandRouter {
    cache: Arc<ResponseCache>,
    fetcher: Arc<UpstreamFetcher>,
    config: RouterConfig,
}

impl CommandRouter {
    pub fn new(cache: Arc<ResponseCache>, fetcher: Arc<UpstreamFetcher>, config: RouterConfig) -> Self {
        Self {
            cache,
            fetcher,
            config,
        }
    }

    pub async fn handle_line(&self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => {
                debug!("Rejected command {:?}: {}", line.trim(), e);
                Reply::error(e.into())
            }
        }
    }

    pub async fn dispatch(&self, command: Command) -> Reply {
        match command {
            Command::Health => Reply::send(json!({
                "ok": true,
                "time": Utc::now().to_rfc3339(),
            })),
            Command::Competitions => Reply::send(catalogue_json()),
            Command::Stats => Reply::send(json!({ "cache": self.cache.stats() })),
            Command::Quit => Reply {
                body: Arc::new(json!({ "ok": true, "bye": true })),
                close: true,
            },
            Command::Data(data) => {
                let request = self.upstream_request(&data, Utc::now().date_naive());
                match self.fetch_cached(request).await {
                    Ok(payload) => Reply::send(payload),
                    Err(e) => {
                        warn!("Command '{}' failed: {}", data, e);
                        Reply::error(e.into())
                    }
                }
            }
        }
    }

    /// Map a data command onto its provider endpoint.
    pub fn upstream_request(&self, command: &DataCommand, today: NaiveDate) -> UpstreamRequest {
        let ttls = &self.config.ttls;
        match command {
            DataCommand::Matches { competition, days } => {
                let competition = canonical_competition(competition);
                let days = days
                    .unwrap_or(self.config.default_match_days)
                    .min(self.config.max_match_days);
                let (date_from, date_to) = date_window(today, days);
                UpstreamRequest {
                    fingerprint: Fingerprint::new(
                        "matches",
                        [("competition", competition.clone()), ("days", days.to_string())],
                    ),
                    path: format!("competitions/{}/matches", competition),
                    query: vec![
                        ("dateFrom".to_string(), date_from),
                        ("dateTo".to_string(), date_to),
                    ],
                    ttl: ttls.matches,
                }
            }
            DataCommand::Standings { competition } => {
                let competition = canonical_competition(competition);
                UpstreamRequest {
                    fingerprint: Fingerprint::new("standings", [("competition", competition.as_str())]),
                    path: format!("competitions/{}/standings", competition),
                    query: Vec::new(),
                    ttl: ttls.standings,
                }
            }
            DataCommand::Scorers { competition } => {
                let competition = canonical_competition(competition);
                UpstreamRequest {
                    fingerprint: Fingerprint::new("scorers", [("competition", competition.as_str())]),
                    path: format!("competitions/{}/scorers", competition),
                    query: Vec::new(),
                    ttl: ttls.scorers,
                }
            }
            DataCommand::Team { team_id } => UpstreamRequest {
                fingerprint: Fingerprint::new("team", [("id", team_id.to_string())]),
                path: format!("teams/{}", team_id),
                query: Vec::new(),
                ttl: ttls.team,
            },
            DataCommand::Player { player_id } => UpstreamRequest {
                fingerprint: Fingerprint::new("player", [("id", player_id.to_string())]),
                path: format!("persons/{}", player_id),
                query: Vec::new(),
                ttl: ttls.player,
            },
        }
    }

    async fn fetch_cached(&self, request: UpstreamRequest) -> Result<Arc<Value>, UpstreamError> {
        if let Some(payload) = self.cache.get(&request.fingerprint) {
            debug!("Cache hit for {}", request.fingerprint);
            return Ok(payload);
        }

        debug!("Cache miss for {}, fetching {}", request.fingerprint, request.path);
        let payload = Arc::new(self.fetcher.fetch(&request.path, &request.query).await?);
        self.cache
            .put(request.fingerprint.clone(), payload.clone(), request.ttl);
        info!(
            "Cached {} for {}s",
            request.fingerprint,
            request.ttl.as_secs()
        );
        Ok(payload)
    }
}

/// `dateFrom`/`dateTo` strings for a window of `days` starting today.
pub fn date_window(today: NaiveDate, days: u32) -> (String, String) {
    let to = today
        .checked_add_days(chrono::Days::new(u64::from(days)))
        .unwrap_or(today);
    (
        today.format("%Y-%m-%d").to_string(),
        to.format("%Y-%m-%d").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::upstream::{Backoff, RetryPolicy, UpstreamTransport};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingTransport {
        calls: AtomicU32,
        fail: bool,
        seen: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    #[async_trait]
    impl UpstreamTransport for RecordingTransport {
        async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push((path.to_string(), query.to_vec()));
            if self.fail {
                return Err(FetchError::Status { status: 503, body: "maintenance".into() });
            }
            Ok(json!({ "matches": [{ "id": 1001, "status": "SCHEDULED" }], "path": path }))
        }
    }

    fn router_with(transport: Arc<RecordingTransport>) -> CommandRouter {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff: Backoff::Linear,
        };
        CommandRouter::new(
            Arc::new(ResponseCache::default()),
            Arc::new(UpstreamFetcher::new(transport, policy)),
            RouterConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_second_identical_request_is_served_from_cache() {
        let transport = Arc::new(RecordingTransport::default());
        let router = router_with(transport.clone());

        let first = router.handle_line("matches PL 7").await;
        assert!(!first.is_error());
        assert_eq!(first.body["matches"][0]["id"], 1001);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        let second = router.handle_line("matches PL 7").await;
        assert_eq!(second.body, first.body);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        let seen = transport.seen.lock();
        assert_eq!(seen[0].0, "competitions/PL/matches");
        assert_eq!(seen[0].1[0].0, "dateFrom");
        assert_eq!(seen[0].1[1].0, "dateTo");
    }

    #[tokio::test]
    async fn test_competition_aliases_share_cache_entry() {
        let transport = Arc::new(RecordingTransport::default());
        let router = router_with(transport.clone());

        router.handle_line("standings 2021").await;
        router.handle_line("standings pl").await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.seen.lock()[0].0, "competitions/PL/standings");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_structured_error() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let router = router_with(transport.clone());

        let reply = router.handle_line("team 57").await;
        assert!(reply.is_error());
        assert!(!reply.close);
        assert_eq!(reply.body["kind"], "upstream_unavailable");
        assert_eq!(reply.body["status"], 503);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

        // Failures are not cached
        router.handle_line("team 57").await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_local_commands_skip_upstream() {
        let transport = Arc::new(RecordingTransport::default());
        let router = router_with(transport.clone());

        let health = router.handle_line("health").await;
        assert_eq!(health.body["ok"], true);
        assert!(health.body["time"].as_str().is_some());

        let catalogue = router.handle_line("competitions").await;
        assert_eq!(catalogue.body["competitions"][0]["code"], "PL");

        let stats = router.handle_line("stats").await;
        assert_eq!(stats.body["cache"]["entries"], 0);

        let quit = router.handle_line("quit").await;
        assert!(quit.close);

        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_commands() {
        let router = router_with(Arc::new(RecordingTransport::default()));

        let unknown = router.handle_line("fixtures PL").await;
        assert_eq!(unknown.body["message"], "Unknown command");
        assert_eq!(unknown.body["kind"], "unknown_command");
        assert!(!unknown.close);

        let missing = router.handle_line("player").await;
        assert_eq!(missing.body["kind"], "malformed_command");
        assert!(!missing.close);
    }

    #[test]
    fn test_matches_window_defaults_and_clamp() {
        let router = router_with(Arc::new(RecordingTransport::default()));
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let default = router.upstream_request(
            &DataCommand::Matches { competition: "PL".into(), days: None },
            today,
        );
        assert_eq!(default.fingerprint.as_str(), "matches?competition=PL&days=30");
        assert_eq!(default.query[1].1, "2026-11-15");

        let clamped = router.upstream_request(
            &DataCommand::Matches { competition: "PL".into(), days: Some(400) },
            today,
        );
        assert_eq!(clamped.fingerprint.as_str(), "matches?competition=PL&days=90");
    }

    #[test]
    fn test_entity_requests() {
        let router = router_with(Arc::new(RecordingTransport::default()));
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let team = router.upstream_request(&DataCommand::Team { team_id: 57 }, today);
        assert_eq!(team.path, "teams/57");
        assert_eq!(team.ttl, CacheTtls::default().team);

        let player = router.upstream_request(&DataCommand::Player { player_id: 44 }, today);
        assert_eq!(player.path, "persons/44");
        assert_eq!(player.fingerprint.as_str(), "player?id=44");
    }

    #[test]
    fn test_date_window() {
        let today = NaiveDate::from_ymd_opt(2026, 12, 28).unwrap();
        assert_eq!(
            date_window(today, 7),
            ("2026-12-28".to_string(), "2027-01-04".to_string())
        );
        assert_eq!(
            date_window(today, 0),
            ("2026-12-28".to_string(), "2026-12-28".to_string())
        );
    }
}
