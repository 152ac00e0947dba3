//! Time-bounded response cache.
//!
//! This module provides:
//! - `ResponseCache`: fingerprint -> JSON payload with a per-entry expiry
//! - Lazy expiry on read (stale entries are dropped when they are looked up)
//! - Hit/miss/put counters for the `stats` command
//!
//! The cache never talks to the network. Callers check it, fetch outside the
//! lock on a miss, then `put` the result. Two concurrent misses for the same
//! fingerprint may therefore both fetch; the later `put` wins.

use crate::fingerprint::Fingerprint;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest lifetime an entry can get; larger TTLs are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Arc<Value>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
}

/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
}

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<FxHashMap<Fingerprint, CacheEntry>>,
    counters: CacheCounters,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live payload. Expired entries are removed and reported as absent.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<Value>> {
        self.get_at(fingerprint, Instant::now())
    }

    pub fn get_at(&self, fingerprint: &Fingerprint, now: Instant) -> Option<Arc<Value>> {
        let mut entries = self.entries.lock();
        let hit = match entries.get(fingerprint).map(|e| (e.is_expired(now), e.payload.clone())) {
            Some((false, payload)) => Some(payload),
            Some((true, _)) => {
                entries.remove(fingerprint);
                None
            }
            None => None,
        };
        drop(entries);

        let counter = if hit.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    /// Store a payload, replacing whatever was there for this fingerprint.
    pub fn put(&self, fingerprint: Fingerprint, payload: Arc<Value>, ttl: Duration) {
        self.put_at(fingerprint, payload, ttl, Instant::now());
    }

    pub fn put_at(&self, fingerprint: Fingerprint, payload: Arc<Value>, ttl: Duration, now: Instant) {
        let entry = CacheEntry {
            payload,
            expires_at: now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now),
        };
        self.entries.lock().insert(fingerprint, entry);
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including ones that expired but were not read since.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fp(comp: &str) -> Fingerprint {
        Fingerprint::new("standings", [("competition", comp)])
    }

    #[test]
    fn test_get_within_ttl() {
        let cache = ResponseCache::default();
        let now = Instant::now();
        cache.put_at(fp("PL"), Arc::new(json!({"standings": []})), Duration::from_secs(60), now);

        let hit = cache.get_at(&fp("PL"), now + Duration::from_secs(59));
        assert_eq!(hit.as_deref(), Some(&json!({"standings": []})));
    }

    #[test]
    fn test_expired_entry_is_absent_and_dropped() {
        let cache = ResponseCache::default();
        let now = Instant::now();
        cache.put_at(fp("PL"), Arc::new(json!({"standings": []})), Duration::from_secs(60), now);
        assert_eq!(cache.len(), 1);

        assert!(cache.get_at(&fp("PL"), now + Duration::from_secs(60)).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = ResponseCache::default();
        cache.put(fp("PL"), Arc::new(json!({"v": 1, "only_in_first": true})), Duration::from_secs(60));
        cache.put(fp("PL"), Arc::new(json!({"v": 2})), Duration::from_secs(60));

        let hit = cache.get(&fp("PL")).unwrap();
        assert_eq!(*hit, json!({"v": 2}));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_refetch_after_expiry_replaces_entry() {
        let cache = ResponseCache::default();
        let now = Instant::now();
        cache.put_at(fp("SA"), Arc::new(json!({"v": 1})), Duration::from_secs(1), now);
        let later = now + Duration::from_secs(5);
        assert!(cache.get_at(&fp("SA"), later).is_none());

        cache.put_at(fp("SA"), Arc::new(json!({"v": 2})), Duration::from_secs(1), later);
        assert_eq!(*cache.get_at(&fp("SA"), later).unwrap(), json!({"v": 2}));
    }

    #[test]
    fn test_stats_and_purge() {
        let cache = ResponseCache::new();
        let now = Instant::now();
        cache.put_at(fp("PL"), Arc::new(json!({})), Duration::from_secs(1), now);
        cache.put_at(fp("BL1"), Arc::new(json!({})), Duration::from_secs(60), now);

        let later = now + Duration::from_secs(2);
        assert!(cache.get_at(&fp("BL1"), later).is_some());
        assert!(cache.get_at(&fp("PD"), later).is_none());
        assert_eq!(cache.purge_expired_at(later), 1);

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.puts, 2);
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let cache = ResponseCache::new();
        let now = Instant::now();
        cache.put_at(fp("CL"), Arc::new(json!({"v": 1})), Duration::from_secs(u64::MAX), now);
        cache.put(fp("PD"), Arc::new(json!({"v": 2})), Duration::MAX);

        assert!(cache.get_at(&fp("CL"), now + Duration::from_secs(86_400)).is_some());
        assert!(cache.get_at(&fp("CL"), now + MAX_TTL).is_none());
        assert_eq!(*cache.get(&fp("PD")).unwrap(), json!({"v": 2}));
    }
}
