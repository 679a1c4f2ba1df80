//! # pricetag
//!
//! Authoritative server for a real-time multiplayer price-guessing game.
//!
//! Players connect over WebSocket to `/ws?name=<name>&room=<code>`. The
//! first player into a room becomes its host and starts the game; each
//! round shows an item, everyone guesses its price before the countdown
//! runs out, and the closest guesses accumulate the lowest scores. After
//! every change the whole room state goes out to every player as a
//! `STATE_UPDATE`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pricetag::prelude::*;
//!
//! # async fn start() -> Result<(), PricetagError> {
//! let config = ServerConfig::load("config.json")?;
//! let server = PricetagServer::builder().config(&config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigSource, ServerConfig};
pub use error::PricetagError;
pub use server::{PricetagServer, PricetagServerBuilder};

/// Everything needed to configure and run a server, plus the wire types
/// a client or test needs to talk to it.
pub mod prelude {
    pub use crate::{ConfigSource, PricetagError, PricetagServer, PricetagServerBuilder, ServerConfig};
    pub use pricetag_protocol::{
        ClientMessage, Codec, IntentFrame, Item, JsonCodec, Phase, PlayerSnapshot, RoomCode,
        ServerMessage, Snapshot,
    };
    pub use pricetag_room::{RoomConfig, RoomError};
    pub use pricetag_session::{Catalog, SessionConfig, SessionError};
    pub use pricetag_tick::TimerConfig;
}
