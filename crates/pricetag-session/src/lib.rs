//! The game itself: one room's state machine and its scoring rules.
//!
//! Everything in this crate is synchronous and single-owner. A
//! [`Session`] is driven by exactly one room actor, which serialises
//! joins, leaves, intents, and timer ticks before they reach it. That is
//! what makes "the last guess arrived" and "the timer ran out" safe to
//! race: whichever the actor processes first resolves the round, and the
//! other finds the session already past `GUESSING`.
//!
//! # Key types
//!
//! - [`Session`]: phases, roster, items, countdown
//! - [`Player`] / [`Roster`]: join-ordered players and host tracking
//! - [`Catalog`]: the items a session is built from
//! - [`scoring`]: round deltas and final ranking
//! - [`SessionConfig`]: round timings and the missed-guess penalty
//!
//! # How it fits in the stack
//!
//! ```text
//! Room actor (above)  ← owns a Session, feeds it commands and ticks
//!     ↕
//! Session (this crate)  ← game rules, pure state
//!     ↕
//! Protocol (below)  ← RoomCode, Phase, Item, Snapshot
//! ```

mod catalog;
mod config;
mod error;
mod player;
pub mod scoring;
mod session;

pub use catalog::Catalog;
pub use config::SessionConfig;
pub use error::SessionError;
pub use player::{Player, Roster};
pub use session::Session;
