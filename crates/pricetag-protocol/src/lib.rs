//! Wire protocol for pricetag.
//!
//! This crate defines what travels between a browser and the game server:
//!
//! - **Types** ([`RoomCode`], [`Phase`], [`Item`], [`Snapshot`]):
//!   the shared vocabulary and the full-state snapshot shape.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`IntentFrame`]):
//!   the `{type, payload}` envelopes in each direction.
//! - **Join requests** ([`JoinRequest`]): the name and room code carried
//!   in the connection URL.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, bytes out.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (intents / snapshots) → Room (game rules)
//! ```

mod codec;
mod error;
mod join;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use join::{JoinRequest, MAX_NAME_LEN, MAX_ROOM_CODE_LEN};
pub use message::{ClientMessage, IntentFrame, ServerMessage};
pub use types::{Item, Phase, PlayerMap, PlayerSnapshot, RoomCode, Snapshot};
