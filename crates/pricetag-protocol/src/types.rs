//! Core protocol types: room codes, phases, items, and the state snapshot.
//!
//! Every type here is something a client sees. Field names follow the
//! browser's camelCase convention through `#[serde(rename_all = ...)]`,
//! so the Rust side keeps snake_case.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The opaque code players type to meet in the same room, e.g. `ABC123`.
///
/// A newtype over `String` so a room code can't be confused with a player
/// name. `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a room code. No normalisation happens here; see
    /// [`JoinRequest`](crate::JoinRequest) for what the server accepts.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The state of a room's game, as shown to every client.
///
/// ```text
/// WAITING ──start──→ GUESSING ──all guessed / timer──→ ROUND_RESULT
///    ↑                   ↑                                  │
///    │                   └────────── more items ────────────┤
///    └──────reset────── GAME_OVER ←──── last item ──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Lobby. Players gather until the host starts the game.
    Waiting,
    /// An item is on display and the countdown is running.
    Guessing,
    /// The price is revealed; the countdown runs to the next round.
    RoundResult,
    /// Every item has been played. Only the host's reset leaves this state.
    GameOver,
}

impl Phase {
    /// Returns `true` if a countdown runs in this phase.
    pub fn is_timed(self) -> bool {
        matches!(self, Self::Guessing | Self::RoundResult)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "WAITING",
            Self::Guessing => "GUESSING",
            Self::RoundResult => "ROUND_RESULT",
            Self::GameOver => "GAME_OVER",
        })
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// One thing to guess the price of.
///
/// `price` is always part of the snapshot. Clients must not display it
/// before the round reaches `ROUND_RESULT`; the server does not redact it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    pub image_url: String,
    pub price: f64,
}

impl Item {
    pub fn new(name: impl Into<String>, image_url: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            image_url: image_url.into(),
            price,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One player's entry in a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub name: String,
    pub is_host: bool,
    pub has_guessed: bool,
    /// `null` until the player guesses in the current round.
    pub current_guess: Option<f64>,
    /// Accumulated distance from the real prices. Lower is better.
    pub score: f64,
}

/// The roster as clients see it: a JSON object keyed by player name.
///
/// Entries are kept (and serialized) in join order, so the object's key
/// order matches the order players arrived in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerMap(Vec<PlayerSnapshot>);

impl PlayerMap {
    pub fn new(players: Vec<PlayerSnapshot>) -> Self {
        Self(players)
    }

    /// Looks up a player by name.
    pub fn get(&self, name: &str) -> Option<&PlayerSnapshot> {
        self.0.iter().find(|p| p.name == name)
    }

    /// Iterates players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for PlayerMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for player in &self.0 {
            map.serialize_entry(&player.name, player)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlayerMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlayerMapVisitor;

        impl<'de> Visitor<'de> for PlayerMapVisitor {
            type Value = PlayerMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of player name to player")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PlayerMap, A::Error> {
                let mut players = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((_name, player)) = access.next_entry::<String, PlayerSnapshot>()? {
                    players.push(player);
                }
                Ok(PlayerMap(players))
            }
        }

        deserializer.deserialize_map(PlayerMapVisitor)
    }
}

/// The complete state of one room, sent to every client after every change.
///
/// Always the whole room, never a diff: a client that missed a frame
/// catches up from the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: RoomCode,
    pub state: Phase,
    pub players: PlayerMap,
    pub items: Vec<Item>,
    /// Index into `items` of the item being (or last) played.
    pub current_item: usize,
    /// Seconds left on the countdown. Zero outside timed phases.
    pub time_left: u32,
}
