//! Inbound intents and outbound updates.
//!
//! Both directions use the same `{ "type": ..., "payload": ... }` shape.
//! Outbound is a plain serde enum. Inbound goes through [`IntentFrame`]
//! first so that an unknown `type` becomes a [`ProtocolError::UnknownType`]
//! we can count, rather than an opaque serde error.

use serde::{Deserialize, Serialize};

use crate::{Codec, ProtocolError, Snapshot};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Something a player asks the room to do.
///
/// Joining is not an intent: it happens when the connection is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientMessage {
    /// Host only, from `WAITING`.
    StartGame,
    /// Any player, once per round, during `GUESSING`.
    Guess(f64),
    /// Host only, from `GAME_OVER`.
    ResetGame,
}

impl ClientMessage {
    pub const START_GAME: &'static str = "START_GAME";
    pub const GUESS: &'static str = "GUESS";
    pub const RESET_GAME: &'static str = "RESET_GAME";

    /// The wire `type` tag for this intent.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartGame => Self::START_GAME,
            Self::Guess(_) => Self::GUESS,
            Self::ResetGame => Self::RESET_GAME,
        }
    }

    /// Decodes an inbound frame into an intent.
    ///
    /// # Errors
    /// - `ProtocolError::Decode`: not JSON, or not `{type, payload}`
    /// - `ProtocolError::UnknownType`: a `type` we don't handle
    /// - `ProtocolError::InvalidPayload`: e.g. `GUESS` without a number
    pub fn decode<C: Codec>(codec: &C, data: &[u8]) -> Result<Self, ProtocolError> {
        codec.decode::<IntentFrame>(data)?.try_into()
    }
}

/// The raw inbound envelope, before its `type` is checked.
///
/// `payload` is `null` for `START_GAME`/`RESET_GAME` and a number for
/// `GUESS`. A missing payload is treated as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<f64>,
}

impl From<ClientMessage> for IntentFrame {
    fn from(msg: ClientMessage) -> Self {
        let payload = match msg {
            ClientMessage::Guess(value) => Some(value),
            ClientMessage::StartGame | ClientMessage::ResetGame => None,
        };
        Self {
            kind: msg.kind().to_owned(),
            payload,
        }
    }
}

impl TryFrom<IntentFrame> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(frame: IntentFrame) -> Result<Self, Self::Error> {
        match frame.kind.as_str() {
            Self::START_GAME => Ok(Self::StartGame),
            Self::RESET_GAME => Ok(Self::ResetGame),
            Self::GUESS => match frame.payload {
                Some(value) => Ok(Self::Guess(value)),
                None => Err(ProtocolError::InvalidPayload {
                    kind: Self::GUESS,
                    reason: "expected a number".into(),
                }),
            },
            _ => Err(ProtocolError::UnknownType(frame.kind)),
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Messages the server pushes to clients.
///
/// `#[serde(tag = "type", content = "payload")]` produces the adjacently
/// tagged form the browser expects:
/// `{ "type": "STATE_UPDATE", "payload": { ...snapshot... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// The full room state after a change.
    StateUpdate(Snapshot),
}
