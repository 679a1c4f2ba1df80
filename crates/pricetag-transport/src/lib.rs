//! Socket layer for pricetag.
//!
//! The server only sees three steps: [`Transport`] accepts raw
//! connections, [`PendingConnection::upgrade`] runs the handshake, and
//! [`Connection`] is one player's socket from then on. Accepting and
//! upgrading are separate so a peer that never finishes its handshake
//! only ever stalls its own task. The WebSocket implementation lives
//! behind the default `websocket` feature.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketPending, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one socket for its whole life.
///
/// Two sockets joining under the same display name still get different
/// ids, which is how a room tells a stale socket from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener producing not-yet-upgraded connections.
pub trait Transport: Send + Sync + 'static {
    type Pending: PendingConnection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next TCP connection. Never waits on the peer itself.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;
}

/// An accepted connection whose handshake hasn't run yet.
pub trait PendingConnection: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    fn peer_addr(&self) -> SocketAddr;

    /// Reads the upgrade request and answers it. Waits on the peer with no
    /// limit of its own; callers wrap it in a timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// One player's socket.
///
/// Reads and writes are locked separately, so the handler can wait in
/// [`recv`](Connection::recv) while room broadcasts go out through
/// [`send_text`](Connection::send_text).
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame (an encoded `STATE_UPDATE`).
    async fn send_text(&self, text: &str) -> Result<(), Self::Error>;

    /// Next inbound frame as raw bytes, or `None` once the player has gone.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the socket. A reason is sent in the close frame so the
    /// browser can show why it was turned away.
    async fn close(&self, reason: Option<&str>) -> Result<(), Self::Error>;

    /// Path and query of the upgrade request, e.g.
    /// `/ws?name=Alice&room=ABC123`.
    fn request_target(&self) -> &str;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocated_ids_are_unique_and_increasing() {
        let first = ConnectionId::next();
        let second = ConnectionId::next();
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn test_display_is_used_in_log_fields() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).get(), 7);
    }
}
