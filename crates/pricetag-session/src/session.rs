//! The per-room game state machine.

use pricetag_protocol::{Item, Phase, PlayerMap, RoomCode, Snapshot};
use tracing::{debug, info};

use crate::scoring;
use crate::{Player, Roster, SessionConfig, SessionError};

/// One room's game: who is playing, which item is up, and the countdown.
///
/// Every operation either applies completely or returns an error and
/// leaves the session untouched. Errors are never partial.
///
/// ```text
/// WAITING ──start_game──→ GUESSING ──all guessed / countdown──→ ROUND_RESULT
///    ↑                       ↑                                      │
///    │                       └─────────── countdown, more items ────┤
///    └─────reset_game───── GAME_OVER ←──── countdown, last item ────┘
/// ```
///
/// The session has no clock of its own. Whoever owns it calls
/// [`tick`](Self::tick) once a second while [`phase`](Self::phase) is
/// timed, and watches [`timer_epoch`](Self::timer_epoch) to know when the
/// countdown was reloaded and its own cadence should restart.
#[derive(Debug, Clone)]
pub struct Session {
    id: RoomCode,
    config: SessionConfig,
    phase: Phase,
    roster: Roster,
    items: Vec<Item>,
    current_item: usize,
    time_left: u32,
    round: u32,
    timer_epoch: u64,
}

impl Session {
    /// Creates a session in `WAITING` with no players.
    ///
    /// `items` is fixed for the life of the session.
    pub fn new(id: RoomCode, config: SessionConfig, items: Vec<Item>) -> Self {
        Self {
            id,
            config: config.validated(),
            phase: Phase::Waiting,
            roster: Roster::new(),
            items,
            current_item: 0,
            time_left: 0,
            round: 0,
            timer_epoch: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Adds a player. The first player into an empty room becomes host.
    ///
    /// A player joining mid-round starts with a score of zero and takes
    /// part from the current round on.
    pub fn add_player(&mut self, name: &str) -> Result<&Player, SessionError> {
        let player = self.roster.insert(name)?;
        info!(room = %self.id, player = %name, host = player.is_host, "player joined");
        Ok(player)
    }

    /// Removes a player.
    ///
    /// If the host leaves, the earliest-joined remaining player becomes
    /// host. A round in progress keeps running: only a guess or the clock
    /// resolves it.
    pub fn remove_player(&mut self, name: &str) -> Result<Player, SessionError> {
        let removed = self
            .roster
            .remove(name)
            .ok_or_else(|| SessionError::UnknownPlayer(name.to_owned()))?;

        info!(room = %self.id, player = %name, remaining = self.roster.len(), "player left");
        if removed.is_host {
            if let Some(host) = self.roster.host() {
                info!(room = %self.id, host = %host.name, "host passed on");
            }
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Starts the game on the first item. Host only, from `WAITING`.
    pub fn start_game(&mut self, sender: &str) -> Result<(), SessionError> {
        const ACTION: &str = "start the game";

        self.require_host(sender, ACTION)?;
        if self.phase != Phase::Waiting {
            return Err(self.invalid_state(ACTION, "the game has already started"));
        }
        if self.items.is_empty() {
            return Err(self.invalid_state(ACTION, "there are no items to play"));
        }

        self.current_item = 0;
        self.round = 1;
        self.begin_guessing();
        info!(room = %self.id, players = self.roster.len(), items = self.items.len(), "game started");
        Ok(())
    }

    /// Records `sender`'s guess for the current item.
    ///
    /// Once every player in the room has guessed, the round resolves
    /// immediately.
    pub fn guess(&mut self, sender: &str, value: f64) -> Result<(), SessionError> {
        const ACTION: &str = "guess";

        if self.phase != Phase::Guessing {
            return Err(self.invalid_state(ACTION, "no item is up for guessing"));
        }
        if !value.is_finite() || value < 0.0 {
            return Err(SessionError::InvalidGuess(value));
        }
        let player = self
            .roster
            .get_mut(sender)
            .ok_or_else(|| SessionError::UnknownPlayer(sender.to_owned()))?;
        if player.has_guessed {
            return Err(SessionError::InvalidState {
                action: ACTION,
                phase: Phase::Guessing,
                reason: "already guessed this round",
            });
        }

        player.has_guessed = true;
        player.current_guess = Some(value);
        debug!(room = %self.id, player = %sender, guess = value, "guess recorded");

        if self.roster.all_guessed() {
            self.resolve_round();
        }
        Ok(())
    }

    /// Puts a finished game back in the lobby. Host only, from
    /// `GAME_OVER`.
    ///
    /// Scores and guesses are cleared. The players and items stay.
    pub fn reset_game(&mut self, sender: &str) -> Result<(), SessionError> {
        const ACTION: &str = "reset the game";

        self.require_host(sender, ACTION)?;
        if self.phase != Phase::GameOver {
            return Err(self.invalid_state(ACTION, "the game is not over"));
        }

        for player in self.roster.iter_mut() {
            player.score = 0.0;
            player.clear_guess();
        }
        self.current_item = 0;
        self.round = 0;
        self.phase = Phase::Waiting;
        self.load_countdown(0);
        info!(room = %self.id, "game reset");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Counts the countdown down by one second.
    ///
    /// Reaching zero in `GUESSING` resolves the round; reaching zero in
    /// `ROUND_RESULT` moves to the next item, or to `GAME_OVER` after the
    /// last one. Outside those phases there is no countdown and this is
    /// an error.
    pub fn tick(&mut self) -> Result<(), SessionError> {
        if !self.phase.is_timed() {
            return Err(self.invalid_state("tick", "no countdown is running"));
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            match self.phase {
                Phase::Guessing => self.resolve_round(),
                Phase::RoundResult => self.advance(),
                Phase::Waiting | Phase::GameOver => {}
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn begin_guessing(&mut self) {
        for player in self.roster.iter_mut() {
            player.clear_guess();
        }
        self.phase = Phase::Guessing;
        self.load_countdown(self.config.guessing_time);
    }

    /// Scores everyone for the current item and reveals the price.
    fn resolve_round(&mut self) {
        let Some(price) = self.items.get(self.current_item).map(|item| item.price) else {
            return;
        };
        scoring::apply_round(&mut self.roster, price, self.config.missed_guess_penalty);
        self.phase = Phase::RoundResult;
        self.load_countdown(self.config.result_time);
        debug!(room = %self.id, round = self.round, price, "round resolved");
    }

    fn advance(&mut self) {
        if self.current_item + 1 < self.items.len() {
            self.current_item += 1;
            self.round += 1;
            self.begin_guessing();
            debug!(room = %self.id, round = self.round, "next round");
        } else {
            self.phase = Phase::GameOver;
            self.load_countdown(0);
            match self.leader() {
                Some(winner) => {
                    info!(room = %self.id, winner = %winner.name, score = winner.score, "game over")
                }
                None => info!(room = %self.id, "game over with no players"),
            }
        }
    }

    fn load_countdown(&mut self, seconds: u32) {
        self.time_left = seconds;
        self.timer_epoch += 1;
    }

    fn require_host(&self, sender: &str, action: &'static str) -> Result<(), SessionError> {
        let player = self
            .roster
            .get(sender)
            .ok_or_else(|| SessionError::UnknownPlayer(sender.to_owned()))?;
        if !player.is_host {
            return Err(SessionError::Unauthorized {
                player: sender.to_owned(),
                action,
            });
        }
        Ok(())
    }

    fn invalid_state(&self, action: &'static str, reason: &'static str) -> SessionError {
        SessionError::InvalidState {
            action,
            phase: self.phase,
            reason,
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// The full state as broadcast to clients.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            id: self.id.clone(),
            state: self.phase,
            players: PlayerMap::new(self.roster.iter().map(Player::snapshot).collect()),
            items: self.items.clone(),
            current_item: self.current_item,
            time_left: self.time_left,
        }
    }

    /// Players best-first: lowest score, then earliest joined.
    pub fn ranking(&self) -> Vec<&Player> {
        scoring::rank(self.roster.iter())
    }

    /// The player currently in first place.
    pub fn leader(&self) -> Option<&Player> {
        self.roster.iter().min_by(|a, b| scoring::compare(a, b))
    }

    pub fn id(&self) -> &RoomCode {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.roster.get(name)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Index of the item being played, or last played once the game is
    /// over.
    pub fn current_item(&self) -> usize {
        self.current_item
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    /// The round being played, counting from 1. Zero before the game
    /// starts.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Changes every time the countdown is reloaded: on entering a phase,
    /// and when leaving the timed phases.
    ///
    /// A round resolved early by the last guess bumps this, so a timer
    /// that was counting down the old phase knows to start over.
    pub fn timer_epoch(&self) -> u64 {
        self.timer_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            guessing_time: 3,
            result_time: 2,
            missed_guess_penalty: 1_000.0,
        }
    }

    fn items(prices: &[f64]) -> Vec<Item> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| Item::new(format!("item {i}"), format!("https://img/{i}"), price))
            .collect()
    }

    fn session(prices: &[f64], players: &[&str]) -> Session {
        let mut session = Session::new(RoomCode::new("ROOM"), config(), items(prices));
        for name in players {
            session.add_player(name).unwrap();
        }
        session
    }

    fn tick_n(session: &mut Session, n: u32) {
        for _ in 0..n {
            session.tick().unwrap();
        }
    }

    #[test]
    fn test_new_session_is_waiting() {
        let s = session(&[10.0], &[]);
        assert_eq!(s.phase(), Phase::Waiting);
        assert_eq!(s.current_item(), 0);
        assert_eq!(s.time_left(), 0);
        assert_eq!(s.round(), 0);
        assert!(s.roster().is_empty());
    }

    #[test]
    fn test_start_game_enters_guessing() {
        let mut s = session(&[10.0, 20.0], &["Alice", "Bob"]);
        let epoch = s.timer_epoch();
        s.start_game("Alice").unwrap();

        assert_eq!(s.phase(), Phase::Guessing);
        assert_eq!(s.time_left(), 3);
        assert_eq!(s.round(), 1);
        assert_eq!(s.current_item(), 0);
        assert_ne!(s.timer_epoch(), epoch);
    }

    #[test]
    fn test_start_game_requires_host() {
        let mut s = session(&[10.0], &["Alice", "Bob"]);
        let err = s.start_game("Bob").unwrap_err();
        assert!(err.is_authorization());
        assert_eq!(s.phase(), Phase::Waiting);
    }

    #[test]
    fn test_start_game_twice_is_state_error() {
        let mut s = session(&[10.0], &["Alice"]);
        s.start_game("Alice").unwrap();
        assert!(s.start_game("Alice").unwrap_err().is_state());
    }

    #[test]
    fn test_start_game_without_items_is_state_error() {
        let mut s = session(&[], &["Alice"]);
        assert!(s.start_game("Alice").unwrap_err().is_state());
        assert_eq!(s.phase(), Phase::Waiting);
    }

    #[test]
    fn test_unknown_sender() {
        let mut s = session(&[10.0], &["Alice"]);
        assert_eq!(
            s.start_game("Mallory").unwrap_err(),
            SessionError::UnknownPlayer("Mallory".into())
        );
        s.start_game("Alice").unwrap();
        assert_eq!(
            s.guess("Mallory", 1.0).unwrap_err(),
            SessionError::UnknownPlayer("Mallory".into())
        );
    }

    #[test]
    fn test_second_guess_is_rejected() {
        let mut s = session(&[10.0], &["Alice", "Bob"]);
        s.start_game("Alice").unwrap();
        s.guess("Alice", 5.0).unwrap();

        let err = s.guess("Alice", 9.0).unwrap_err();
        assert!(err.is_state());
        assert_eq!(s.player("Alice").unwrap().current_guess(), Some(5.0));
    }

    #[test]
    fn test_invalid_guess_values() {
        let mut s = session(&[10.0], &["Alice"]);
        s.start_game("Alice").unwrap();
        for bad in [-0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(s.guess("Alice", bad), Err(SessionError::InvalidGuess(_))));
        }
        assert!(!s.player("Alice").unwrap().has_guessed());
    }

    #[test]
    fn test_countdown_resolves_round() {
        let mut s = session(&[10.0, 20.0], &["Alice", "Bob"]);
        s.start_game("Alice").unwrap();
        s.guess("Alice", 12.0).unwrap();

        tick_n(&mut s, 2);
        assert_eq!(s.phase(), Phase::Guessing);
        assert_eq!(s.time_left(), 1);

        s.tick().unwrap();
        assert_eq!(s.phase(), Phase::RoundResult);
        assert_eq!(s.time_left(), 2);
        assert_eq!(s.player("Alice").unwrap().score(), 2.0);
        assert_eq!(s.player("Bob").unwrap().score(), 1_000.0);
    }

    #[test]
    fn test_round_result_advances_to_next_item() {
        let mut s = session(&[10.0, 20.0], &["Alice"]);
        s.start_game("Alice").unwrap();
        s.guess("Alice", 10.0).unwrap();
        assert_eq!(s.phase(), Phase::RoundResult);

        tick_n(&mut s, 2);
        assert_eq!(s.phase(), Phase::Guessing);
        assert_eq!(s.current_item(), 1);
        assert_eq!(s.round(), 2);
        assert_eq!(s.time_left(), 3);
        let alice = s.player("Alice").unwrap();
        assert!(!alice.has_guessed());
        assert_eq!(alice.current_guess(), None);
    }

    #[test]
    fn test_last_round_ends_game() {
        let mut s = session(&[10.0], &["Alice"]);
        s.start_game("Alice").unwrap();
        s.guess("Alice", 10.0).unwrap();
        tick_n(&mut s, 2);

        assert_eq!(s.phase(), Phase::GameOver);
        assert_eq!(s.current_item(), 0);
        assert_eq!(s.time_left(), 0);
        assert!(s.tick().unwrap_err().is_state());
    }

    #[test]
    fn test_tick_outside_timed_phase_is_error() {
        let mut s = session(&[10.0], &["Alice"]);
        assert!(s.tick().unwrap_err().is_state());
        assert_eq!(s.time_left(), 0);
    }

    #[test]
    fn test_early_resolution_changes_timer_epoch() {
        let mut s = session(&[10.0], &["Alice"]);
        s.start_game("Alice").unwrap();
        let guessing_epoch = s.timer_epoch();

        s.guess("Alice", 10.0).unwrap();
        assert_ne!(s.timer_epoch(), guessing_epoch);
        assert_eq!(s.phase(), Phase::RoundResult);
    }

    #[test]
    fn test_plain_tick_keeps_timer_epoch() {
        let mut s = session(&[10.0], &["Alice"]);
        s.start_game("Alice").unwrap();
        let epoch = s.timer_epoch();
        s.tick().unwrap();
        assert_eq!(s.timer_epoch(), epoch);
    }

    #[test]
    fn test_guess_after_resolution_is_state_error() {
        let mut s = session(&[10.0], &["Alice", "Bob"]);
        s.start_game("Alice").unwrap();
        tick_n(&mut s, 3);
        assert_eq!(s.phase(), Phase::RoundResult);
        assert!(s.guess("Bob", 10.0).unwrap_err().is_state());
    }

    #[test]
    fn test_leaving_does_not_resolve_the_round() {
        let mut s = session(&[10.0], &["Alice", "Bob"]);
        s.start_game("Alice").unwrap();
        s.guess("Alice", 8.0).unwrap();
        let epoch = s.timer_epoch();

        s.remove_player("Bob").unwrap();
        assert_eq!(s.phase(), Phase::Guessing);
        assert_eq!(s.timer_epoch(), epoch, "countdown keeps running");
        assert_eq!(s.player("Alice").unwrap().score(), 0.0);
    }

    #[test]
    fn test_last_player_leaving_mid_round_does_not_resolve() {
        let mut s = session(&[10.0], &["Alice"]);
        s.start_game("Alice").unwrap();
        s.remove_player("Alice").unwrap();
        assert_eq!(s.phase(), Phase::Guessing);
    }

    #[test]
    fn test_remove_unknown_player() {
        let mut s = session(&[10.0], &["Alice"]);
        assert_eq!(
            s.remove_player("Bob").unwrap_err(),
            SessionError::UnknownPlayer("Bob".into())
        );
    }

    #[test]
    fn test_reset_requires_game_over_and_host() {
        let mut s = session(&[10.0], &["Alice", "Bob"]);
        assert!(s.reset_game("Alice").unwrap_err().is_state());

        s.start_game("Alice").unwrap();
        s.guess("Alice", 1.0).unwrap();
        s.guess("Bob", 2.0).unwrap();
        tick_n(&mut s, 2);
        assert_eq!(s.phase(), Phase::GameOver);

        assert!(s.reset_game("Bob").unwrap_err().is_authorization());
        assert_eq!(s.phase(), Phase::GameOver);

        s.reset_game("Alice").unwrap();
        assert_eq!(s.phase(), Phase::Waiting);
        assert_eq!(s.round(), 0);
        assert!(s.roster().iter().all(|p| p.score() == 0.0));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut s = session(&[10.0], &["Alice", "Bob"]);
        s.start_game("Alice").unwrap();
        s.guess("Bob", 7.0).unwrap();

        let snap = s.snapshot();
        assert_eq!(snap.id.as_str(), "ROOM");
        assert_eq!(snap.state, Phase::Guessing);
        assert_eq!(snap.time_left, 3);
        assert_eq!(snap.items.len(), 1);
        let names: Vec<&str> = snap.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob"]);
        let bob = snap.players.get("Bob").unwrap();
        assert!(bob.has_guessed);
        assert_eq!(bob.current_guess, Some(7.0));
        assert!(snap.players.get("Alice").unwrap().is_host);
    }

    #[test]
    fn test_leader_and_ranking() {
        let mut s = session(&[10.0], &["Alice", "Bob", "Carol"]);
        assert_eq!(s.leader().unwrap().name(), "Alice");

        s.start_game("Alice").unwrap();
        s.guess("Alice", 20.0).unwrap();
        s.guess("Bob", 9.0).unwrap();
        s.guess("Carol", 0.0).unwrap();

        let ranking: Vec<&str> = s.ranking().into_iter().map(Player::name).collect();
        assert_eq!(ranking, ["Bob", "Alice", "Carol"]);
        assert_eq!(s.leader().unwrap().name(), "Bob");
    }

    #[test]
    fn test_config_is_validated() {
        let s = Session::new(
            RoomCode::new("ROOM"),
            SessionConfig {
                guessing_time: 0,
                ..SessionConfig::default()
            },
            items(&[1.0]),
        );
        assert_eq!(s.config().guessing_time, 1);
    }
}
