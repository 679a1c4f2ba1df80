//! Session configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Round timings and scoring policy for one session.
///
/// The server builds one of these from its config file and hands a copy
/// to every room it creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds players get to guess each item.
    pub guessing_time: u32,

    /// Seconds the revealed price stays on screen before the next round.
    pub result_time: u32,

    /// Score added for a round in which a player did not guess.
    ///
    /// Deliberately huge: anyone who skips a round ranks below everyone
    /// who guessed every round, however badly.
    pub missed_guess_penalty: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            guessing_time: 30,
            result_time: 5,
            missed_guess_penalty: 1_000_000.0,
        }
    }
}

impl SessionConfig {
    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// - Both timers are at least one second. A zero countdown would
    ///   never tick down to its transition.
    /// - The penalty must be finite and nonnegative, otherwise the default
    ///   is used. Scores only ever grow.
    pub fn validated(mut self) -> Self {
        if self.guessing_time == 0 {
            warn!("guessing_time of 0 is not allowed, using 1");
            self.guessing_time = 1;
        }
        if self.result_time == 0 {
            warn!("result_time of 0 is not allowed, using 1");
            self.result_time = 1;
        }
        if !self.missed_guess_penalty.is_finite() || self.missed_guess_penalty < 0.0 {
            let fallback = Self::default().missed_guess_penalty;
            warn!(
                penalty = self.missed_guess_penalty,
                fallback, "missed_guess_penalty must be finite and >= 0"
            );
            self.missed_guess_penalty = fallback;
        }
        self
    }
}
