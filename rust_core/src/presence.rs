//! Chat peer presence.
//!
//! Peers are identified by their UDP source address. Any datagram counts as
//! proof of life; a peer silent for longer than the liveness window is
//! dropped the next time the table is consulted. There is no background
//! sweeper: eviction only happens on `touch` and `live_peers`.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::info;

/// Default liveness window; clients heartbeat every 5 seconds.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEntry {
    pub address: SocketAddr,
    pub last_seen: Instant,
}

impl PresenceEntry {
    fn is_live(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) <= window
    }
}

#[derive(Debug)]
pub struct PresenceTable {
    peers: Mutex<FxHashMap<SocketAddr, PresenceEntry>>,
    liveness_window: Duration,
}

impl Default for PresenceTable {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_WINDOW)
    }
}

impl PresenceTable {
    pub fn new(liveness_window: Duration) -> Self {
        Self {
            peers: Mutex::new(FxHashMap::default()),
            liveness_window,
        }
    }

    pub fn liveness_window(&self) -> Duration {
        self.liveness_window
    }

    /// Record traffic from `address`. Returns true when the peer is new
    /// (never seen, or previously evicted).
    pub fn touch(&self, address: SocketAddr) -> bool {
        self.touch_at(address, Instant::now())
    }

    pub fn touch_at(&self, address: SocketAddr, now: Instant) -> bool {
        let mut peers = self.peers.lock();
        Self::evict_expired(&mut peers, now, self.liveness_window);
        let is_new = !peers.contains_key(&address);
        peers.insert(
            address,
            PresenceEntry {
                address,
                last_seen: now,
            },
        );
        is_new
    }

    /// Live peers other than `exclude`, sorted by address.
    pub fn live_peers(&self, exclude: Option<SocketAddr>) -> Vec<SocketAddr> {
        self.live_peers_at(exclude, Instant::now())
    }

    pub fn live_peers_at(&self, exclude: Option<SocketAddr>, now: Instant) -> Vec<SocketAddr> {
        let mut peers = self.peers.lock();
        Self::evict_expired(&mut peers, now, self.liveness_window);
        let mut live: Vec<SocketAddr> = peers
            .keys()
            .copied()
            .filter(|addr| Some(*addr) != exclude)
            .collect();
        live.sort();
        live
    }

    /// Forget a peer immediately (e.g., after a failed send).
    pub fn remove(&self, address: &SocketAddr) -> bool {
        self.peers.lock().remove(address).is_some()
    }

    pub fn get(&self, address: &SocketAddr) -> Option<PresenceEntry> {
        self.peers.lock().get(address).copied()
    }

    /// Number of tracked peers, including ones not yet found expired.
    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }

    fn evict_expired(
        peers: &mut FxHashMap<SocketAddr, PresenceEntry>,
        now: Instant,
        window: Duration,
    ) {
        peers.retain(|addr, entry| {
            let live = entry.is_live(now, window);
            if !live {
                info!(
                    "Chat peer {} evicted after {}s of silence",
                    addr,
                    now.saturating_duration_since(entry.last_seen).as_secs()
                );
            }
            live
        });
    }
}
