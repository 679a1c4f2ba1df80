//! Round scoring and the final ranking.
//!
//! Scores are accumulated distance from the real price, so lower is
//! better. A player who doesn't guess in a round takes a fixed penalty
//! instead (see [`SessionConfig::missed_guess_penalty`]).
//!
//! [`SessionConfig::missed_guess_penalty`]: crate::SessionConfig::missed_guess_penalty

use std::cmp::Ordering;

use crate::{Player, Roster};

/// What one round adds to a player's score.
///
/// `|guess - price|` for a guess, `penalty` for no guess. Never negative
/// as long as `penalty` isn't.
pub fn round_delta(guess: Option<f64>, price: f64, penalty: f64) -> f64 {
    match guess {
        Some(guess) => (guess - price).abs(),
        None => penalty,
    }
}

/// Adds each player's delta for a round priced at `price`.
pub fn apply_round(roster: &mut Roster, price: f64, penalty: f64) {
    for player in roster.iter_mut() {
        player.score += round_delta(player.current_guess, price, penalty);
    }
}

/// Orders two players for the leaderboard: lower score first, then
/// whoever joined first.
pub fn compare(a: &Player, b: &Player) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.join_seq.cmp(&b.join_seq))
}

/// Players best-first.
pub fn rank<'a>(players: impl IntoIterator<Item = &'a Player>) -> Vec<&'a Player> {
    let mut ranked: Vec<&Player> = players.into_iter().collect();
    ranked.sort_by(|a, b| compare(a, b));
    ranked
}
