//! Room configuration.

use pricetag_session::SessionConfig;
use pricetag_tick::TimerConfig;

/// Settings shared by every room the registry creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Capacity of each room's command channel. Senders wait when it's
    /// full.
    pub channel_size: usize,

    /// Maximum players per room. `None` means no limit.
    pub max_players: Option<usize>,

    /// Shuffle the catalog for each new room instead of playing it in
    /// order.
    pub shuffle_items: bool,

    /// Countdown cadence.
    pub timer: TimerConfig,

    /// Round timings and scoring for each room's session.
    pub session: SessionConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            max_players: None,
            shuffle_items: false,
            timer: TimerConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl RoomConfig {
    /// Returns `true` if a room holding `players` can take one more.
    pub fn has_room_for(&self, players: usize) -> bool {
        self.max_players.is_none_or(|max| players < max)
    }
}
