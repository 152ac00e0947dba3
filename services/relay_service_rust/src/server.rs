//! TCP command server.
//!
//! One accept loop; one spawned task per connection. Each connection runs the
//! `Accepted -> Serving -> Closed` state machine: read a chunk, route every
//! command line in it, write one JSON object per command, repeat.
//!
//! Framing: replies carry no delimiter. A client that sends one command and
//! waits for its reply gets exactly one JSON object per read. If a single
//! write holds several newline-separated commands, their replies are written
//! back to back (`{...}{...}`) and the client must split them itself, e.g.
//! with a streaming JSON decoder.

use anyhow::{Context, Result};
use football_hub_core::{CommandRouter, RelayError};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Size of one read; a command always fits.
pub const MAX_COMMAND_BYTES: usize = 1024;

/// Pause after a failed `accept` (e.g., out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum CloseReason {
    /// Empty read: the client closed its end
    PeerClosed,
    /// Client sent `quit`
    ClientQuit,
    /// Read or write failed; always `RelayError::Transport`
    Transport(RelayError),
}

impl CloseReason {
    fn transport(e: std::io::Error) -> Self {
        CloseReason::Transport(RelayError::from(e))
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("peer closed"),
            CloseReason::ClientQuit => f.write_str("client quit"),
            CloseReason::Transport(e) => write!(f, "{} ({})", e, e.kind()),
        }
    }
}

#[derive(Debug)]
pub enum ConnectionState {
    Accepted,
    Serving,
    Closed(CloseReason),
}

/// A single client connection driven by the shared router.
pub struct Connection<S> {
    id: Uuid,
    peer: SocketAddr,
    stream: S,
    router: Arc<CommandRouter>,
    state: ConnectionState,
    requests_served: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, router: Arc<CommandRouter>) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            stream,
            router,
            state: ConnectionState::Accepted,
            requests_served: 0,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Drive the connection until it closes. Returns why it closed.
    pub async fn serve(mut self) -> CloseReason {
        let mut buf = vec![0u8; MAX_COMMAND_BYTES];
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Serving) {
                ConnectionState::Accepted => {
                    info!("[NEW CONNECTION] {} ({})", self.peer, self.id);
                    ConnectionState::Serving
                }
                ConnectionState::Serving => self.serve_once(&mut buf).await,
                ConnectionState::Closed(reason) => {
                    info!(
                        "[DISCONNECTED] {} ({}) after {} request(s): {}",
                        self.peer, self.id, self.requests_served, reason
                    );
                    let _ = self.stream.shutdown().await;
                    return reason;
                }
            };
        }
    }

    /// One read, then one reply per command line in it.
    async fn serve_once(&mut self, buf: &mut [u8]) -> ConnectionState {
        let n = match self.stream.read(buf).await {
            Ok(0) => return ConnectionState::Closed(CloseReason::PeerClosed),
            Ok(n) => n,
            Err(e) => return ConnectionState::Closed(CloseReason::transport(e)),
        };

        let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
        let mut lines: Vec<&str> = chunk.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            // Whitespace-only read: let the router answer with a malformed-command error
            lines.push(chunk.as_str());
        }

        for line in lines {
            debug!("Received command from {}: {:?}", self.peer, line.trim());
            let reply = self.router.handle_line(line).await;
            self.requests_served += 1;

            let bytes = match serde_json::to_vec(&*reply.body) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Failed to serialize reply for {}: {}", self.peer, e);
                    br#"{"error":true,"kind":"internal","message":"Failed to serialize reply"}"#.to_vec()
                }
            };
            if let Err(e) = self.stream.write_all(&bytes).await {
                // The client left mid-request; nothing to escalate
                debug!("Dropping reply to {}: {}", self.peer, e);
                return ConnectionState::Closed(CloseReason::transport(e));
            }
            if reply.close {
                return ConnectionState::Closed(CloseReason::ClientQuit);
            }
        }
        ConnectionState::Serving
    }
}

pub struct ConnectionServer {
    listener: TcpListener,
    router: Arc<CommandRouter>,
}

impl ConnectionServer {
    /// Bind the listener. Failure here is fatal for the service.
    pub async fn bind(addr: &str, router: Arc<CommandRouter>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind TCP command server on {}", addr))?;
        info!("[LISTENING] Command server on {}", listener.local_addr()?);
        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept forever, one task per connection.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("set_nodelay failed for {}: {}", peer, e);
                    }
                    let connection = Connection::new(stream, peer, self.router.clone());
                    tokio::spawn(connection.serve());
                }
                Err(e) => {
                    warn!("Error accepting connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}
