//! Server configuration.
//!
//! Loaded at startup from a JSON file. Every field has a default, so the
//! server runs without a config file at all.

use std::path::Path;
use std::time::Duration;

use pricetag_protocol::Item;
use pricetag_room::RoomConfig;
use pricetag_session::{Catalog, SessionConfig};
use serde::{Deserialize, Serialize};

use crate::PricetagError;

/// Complete server configuration.
///
/// Keys are camelCase, e.g.:
///
/// ```json
/// { "bindAddr": "0.0.0.0:8080", "guessingTime": 20, "resultTime": 5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Default log filter, used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Seconds players get to guess each item.
    pub guessing_time: u32,

    /// Seconds the revealed price stays up before the next round.
    pub result_time: u32,

    /// Player limit per room. Unlimited when absent.
    pub max_players: Option<usize>,

    /// Score added for each round a player doesn't guess in.
    pub missed_guess_penalty: f64,

    /// Shuffle the items for each new room.
    pub shuffle_items: bool,

    /// Custom catalog. The built-in five items are used when absent.
    pub items: Option<Vec<Item>>,

    /// Consecutive malformed frames tolerated before a connection is
    /// closed.
    pub max_protocol_violations: u32,

    /// Seconds a new connection gets to complete its WebSocket upgrade.
    pub handshake_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            log_level: "info".into(),
            guessing_time: session.guessing_time,
            result_time: session.result_time,
            max_players: None,
            missed_guess_penalty: session.missed_guess_penalty,
            shuffle_items: false,
            items: None,
            max_protocol_violations: 5,
            handshake_timeout_secs: 10,
        }
    }
}

/// Where a loaded [`ServerConfig`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// The file didn't exist.
    Defaults,
}

impl ServerConfig {
    /// Loads the config from `path`. A missing file yields the defaults,
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PricetagError> {
        let path = path.as_ref();
        let (config, source) = Self::read(path)?;
        if source == ConfigSource::Defaults {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
        }
        Ok(config)
    }

    /// Like [`load`](Self::load), but reports the fallback instead of
    /// logging it. For callers that set up logging from the config itself.
    pub fn read(path: impl AsRef<Path>) -> Result<(Self, ConfigSource), PricetagError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents)
                .map(|config| (config, ConfigSource::File))
                .map_err(|source| PricetagError::Config {
                    path: path.display().to_string(),
                    source,
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((Self::default(), ConfigSource::Defaults))
            }
            Err(e) => Err(PricetagError::Io(e)),
        }
    }

    /// Parses a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Round timings and scoring for every room.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            guessing_time: self.guessing_time,
            result_time: self.result_time,
            missed_guess_penalty: self.missed_guess_penalty,
        }
        .validated()
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            max_players: self.max_players,
            shuffle_items: self.shuffle_items,
            session: self.session_config(),
            ..RoomConfig::default()
        }
    }

    /// The configured items, or the built-in catalog.
    ///
    /// Items with a negative or non-finite price are skipped.
    pub fn catalog(&self) -> Catalog {
        let Some(items) = &self.items else {
            return Catalog::builtin();
        };
        let valid = items
            .iter()
            .filter(|item| {
                let ok = item.price.is_finite() && item.price >= 0.0;
                if !ok {
                    tracing::warn!(item = %item.name, price = item.price, "skipping item with invalid price");
                }
                ok
            })
            .cloned()
            .collect();
        Catalog::new(valid)
    }

    /// `handshake_timeout_secs`, but never less than one second.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs.max(1))
    }

    /// `max_protocol_violations`, but never less than one.
    pub fn protocol_violation_limit(&self) -> u32 {
        self.max_protocol_violations.max(1)
    }
}
