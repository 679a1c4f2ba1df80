//! Error types for the session layer.

use pricetag_protocol::Phase;

/// Why a session refused an operation.
///
/// A refused operation never changes the session, so callers can log the
/// error and carry on. Nothing is broadcast for a refusal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// A player who is not the host sent a host-only intent.
    #[error("{player} is not the host and cannot {action}")]
    Unauthorized {
        player: String,
        action: &'static str,
    },

    /// The intent is not valid in the current phase, e.g. a guess outside
    /// `GUESSING`, a second guess in one round, or starting with no items.
    #[error("cannot {action} during {phase}: {reason}")]
    InvalidState {
        action: &'static str,
        phase: Phase,
        reason: &'static str,
    },

    /// Someone in the room already uses this display name.
    #[error("name {0:?} is already taken")]
    DuplicateName(String),

    /// No player with this name is in the room.
    #[error("no player named {0:?}")]
    UnknownPlayer(String),

    /// The guess is not a finite, nonnegative number.
    #[error("guess {0} is not a valid price")]
    InvalidGuess(f64),
}

impl SessionError {
    /// `true` for host-only intents sent by someone else.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// `true` for intents that don't fit the current phase or round.
    pub fn is_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}
