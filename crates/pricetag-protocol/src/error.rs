//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means "the bytes or the request were wrong",
//! never "the game refused the move". Game-rule rejections live in the
//! session crate.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (malformed JSON, wrong field types,
    /// truncated frames).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed, but its `type` tag is not an intent we know.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The frame's `type` is known but its payload does not fit it,
    /// e.g. a `GUESS` without a number.
    #[error("invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },

    /// The connection request did not carry a usable name and room code.
    #[error("invalid join request: {0}")]
    InvalidJoin(String),

    /// The message is invalid for some other protocol-level reason.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
