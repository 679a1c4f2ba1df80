//! Unified error type for the pricetag server.

use pricetag_protocol::ProtocolError;
use pricetag_room::RoomError;
use pricetag_transport::TransportError;

/// Everything that can end a connection handler or stop the server.
///
/// Refused game intents never show up here: the room logs and drops them
/// without touching the connection.
#[derive(Debug, thiserror::Error)]
pub enum PricetagError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A malformed frame or join request.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room refused a join or leave.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The config file exists but isn't valid.
    #[error("invalid config {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The config file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
