//! Chat datagram classification.

use std::borrow::Cow;

/// Reserved prefix of heartbeat datagrams: `PING|<sender>`.
pub const HEARTBEAT_PREFIX: &str = "PING|";

/// Largest datagram the relay accepts.
pub const MAX_DATAGRAM_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram<'a> {
    /// Keep-alive; never relayed
    Heartbeat { sender: Cow<'a, str> },
    /// Anything else, relayed verbatim
    Chat(&'a [u8]),
}

impl<'a> Datagram<'a> {
    pub fn classify(bytes: &'a [u8], heartbeat_prefix: &[u8]) -> Self {
        match bytes.strip_prefix(heartbeat_prefix) {
            Some(sender) if !heartbeat_prefix.is_empty() => Datagram::Heartbeat {
                sender: match String::from_utf8_lossy(sender) {
                    Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
                    Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
                },
            },
            _ => Datagram::Chat(bytes),
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Datagram::Heartbeat { .. })
    }
}
