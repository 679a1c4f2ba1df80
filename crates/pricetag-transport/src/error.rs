use std::io;

/// Errors from the socket layer.
///
/// Handshake and frame errors from the WebSocket library are carried as
/// `io::Error` so the variants stay the same whichever transport is
/// compiled in.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not bind its address.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A TCP accept or the WebSocket upgrade failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Writing a frame to the player failed.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Reading a frame from the player failed.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}
