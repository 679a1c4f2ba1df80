//! WebSocket transport implementation using `tokio-tungstenite`.

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::{Connection, ConnectionId, PendingConnection, Transport, TransportError};

/// Close-frame reasons must fit in a control frame (125 bytes minus the code).
const MAX_CLOSE_REASON: usize = 123;

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_owned(),
                source,
            })?;
        tracing::info!(addr, "listening for players");
        Ok(Self { listener })
    }

    /// Returns the address the listener is actually bound to.
    ///
    /// Useful after binding to port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Pending = WebSocketPending;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Pending, Self::Error> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        tracing::trace!(%peer, "tcp connection accepted");
        Ok(WebSocketPending { stream, peer })
    }
}

/// A TCP connection that hasn't sent its upgrade request yet.
pub struct WebSocketPending {
    stream: TcpStream,
    peer: SocketAddr,
}

impl PendingConnection for WebSocketPending {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        // The room code and display name travel in the upgrade request's
        // query string, so keep the request target around.
        let mut target = String::new();
        let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            target = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_owned())
                .unwrap_or_default();
            Ok(resp)
        };

        let ws = tokio_tungstenite::accept_hdr_async(self.stream, callback)
            .await
            .map_err(|e| TransportError::Accept(io::Error::new(io::ErrorKind::ConnectionRefused, e)))?;

        let id = ConnectionId::next();
        tracing::debug!(%id, peer = %self.peer, %target, "player socket upgraded");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            target,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The socket is split so a pending `recv` never holds up outbound frames.
pub struct WebSocketConnection {
    id: ConnectionId,
    target: String,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send_text(&self, text: &str) -> Result<(), Self::Error> {
        let msg = Message::Text(text.to_owned().into());
        self.sink.lock().await.send(msg).await.map_err(send_failed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Ok(None);
                }
                Some(Err(e)) => {
                    return Err(TransportError::Receive(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self, reason: Option<&str>) -> Result<(), Self::Error> {
        let mut sink = self.sink.lock().await;
        let result = match reason {
            Some(reason) => {
                let frame = CloseFrame {
                    code: CloseCode::Policy,
                    reason: truncate_reason(reason).to_owned().into(),
                };
                sink.send(Message::Close(Some(frame))).await
            }
            None => sink.close().await,
        };
        match result {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(send_failed(e)),
        }
    }

    fn request_target(&self) -> &str {
        &self.target
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

fn send_failed(e: WsError) -> TransportError {
    TransportError::Send(io::Error::new(io::ErrorKind::BrokenPipe, e))
}

/// Cuts `reason` down to the close-frame limit on a char boundary.
fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_reason_keeps_short_text() {
        assert_eq!(truncate_reason("room is full"), "room is full");
    }

    #[test]
    fn test_truncate_reason_respects_char_boundaries() {
        let long = "é".repeat(100); // 200 bytes
        let cut = truncate_reason(&long);
        assert!(cut.len() <= MAX_CLOSE_REASON);
        assert!(cut.chars().all(|c| c == 'é'));
    }
}
