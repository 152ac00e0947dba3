//! UDP chat relay.
//!
//! A single receive loop: every datagram refreshes the sender's presence,
//! heartbeats stop there, chat lines are copied byte-for-byte to every other
//! live peer. A peer whose send fails is dropped on the spot.

use anyhow::{Context, Result};
use football_hub_core::chat::{Datagram, MAX_DATAGRAM_BYTES};
use football_hub_core::PresenceTable;
use futures_util::future::join_all;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// What happened to one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Heartbeat,
    Relayed { delivered: usize, dropped: usize },
    /// Larger than `MAX_DATAGRAM_BYTES`; counted as liveness, not relayed
    Oversized,
}

pub struct ChatRelay {
    socket: Arc<UdpSocket>,
    presence: PresenceTable,
    heartbeat_prefix: Vec<u8>,
}

impl ChatRelay {
    /// Bind the relay socket. Failure here is fatal for the service.
    pub async fn bind(addr: &str, liveness_window: Duration, heartbeat_prefix: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind UDP chat relay on {}", addr))?;
        let presence = PresenceTable::new(liveness_window);
        info!(
            "[LISTENING] Chat relay on {} (liveness window {}s)",
            socket.local_addr()?,
            presence.liveness_window().as_secs()
        );
        Ok(Self {
            socket: Arc::new(socket),
            presence,
            heartbeat_prefix: heartbeat_prefix.as_bytes().to_vec(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn presence(&self) -> &PresenceTable {
        &self.presence
    }

    /// Receive forever. Datagrams are handled strictly one at a time.
    pub async fn run(self) {
        // One spare byte to detect datagrams over the limit
        let mut buf = vec![0u8; MAX_DATAGRAM_BYTES + 1];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((n, from)) => {
                    self.handle_datagram(&buf[..n], from).await;
                }
                Err(e) => {
                    // ICMP port-unreachable from an earlier send can surface here
                    warn!("Error in chat relay receive: {}", e);
                }
            }
        }
    }

    pub async fn handle_datagram(&self, bytes: &[u8], from: SocketAddr) -> RelayOutcome {
        if self.presence.touch(from) {
            info!("Chat peer {} joined", from);
        }

        if bytes.len() > MAX_DATAGRAM_BYTES {
            warn!(
                "Dropping oversized datagram from {} (>{} bytes)",
                from, MAX_DATAGRAM_BYTES
            );
            return RelayOutcome::Oversized;
        }

        match Datagram::classify(bytes, &self.heartbeat_prefix) {
            Datagram::Heartbeat { sender } => {
                debug!("Heartbeat from {} ({})", from, sender);
                RelayOutcome::Heartbeat
            }
            Datagram::Chat(payload) => {
                debug!(
                    "Chat from {}: {}",
                    from,
                    String::from_utf8_lossy(payload).trim_end()
                );
                self.fan_out(payload, from).await
            }
        }
    }

    async fn fan_out(&self, payload: &[u8], from: SocketAddr) -> RelayOutcome {
        let peers = self.presence.live_peers(Some(from));
        let sends = peers.iter().map(|peer| {
            let socket = self.socket.clone();
            async move { (*peer, socket.send_to(payload, *peer).await) }
        });

        let mut delivered = 0;
        let mut dropped = 0;
        for (peer, result) in join_all(sends).await {
            match result {
                Ok(_) => delivered += 1,
                Err(e) => {
                    warn!("Send to chat peer {} failed, dropping it: {}", peer, e);
                    self.presence.remove(&peer);
                    dropped += 1;
                }
            }
        }
        RelayOutcome::Relayed { delivered, dropped }
    }
}
