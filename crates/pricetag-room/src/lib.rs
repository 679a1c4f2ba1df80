//! Rooms for pricetag.
//!
//! Each room runs as an isolated Tokio task (actor) that owns its game
//! [`Session`](pricetag_session::Session), its countdown timer, and the
//! outbound channel of every player in it. Joins, leaves, intents, and
//! timer ticks are all commands the actor handles one at a time, and each
//! accepted change is followed by exactly one `STATE_UPDATE` broadcast.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: opens rooms on first join, closes them when empty
//! - [`RoomHandle`]: sends commands to a running room actor
//! - [`PlayerConnection`]: a player's name plus their outbound channel
//! - [`RoomConfig`]: player limit, timer, and session settings

mod config;
mod error;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{OutboundSender, PlayerConnection, RoomHandle, RoomOutbound};
