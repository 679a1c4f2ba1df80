//! Players and the join-ordered roster.

use pricetag_protocol::PlayerSnapshot;

use crate::SessionError;

/// One player in a room.
///
/// Identified by display name, which is unique within its room.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub(crate) name: String,
    pub(crate) is_host: bool,
    pub(crate) has_guessed: bool,
    pub(crate) current_guess: Option<f64>,
    pub(crate) score: f64,
    /// Position in join order, used to break score ties.
    pub(crate) join_seq: u64,
}

impl Player {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn has_guessed(&self) -> bool {
        self.has_guessed
    }

    pub fn current_guess(&self) -> Option<f64> {
        self.current_guess
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn join_seq(&self) -> u64 {
        self.join_seq
    }

    /// Clears this round's guess.
    pub(crate) fn clear_guess(&mut self) {
        self.has_guessed = false;
        self.current_guess = None;
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            name: self.name.clone(),
            is_host: self.is_host,
            has_guessed: self.has_guessed,
            current_guess: self.current_guess,
            score: self.score,
        }
    }
}

/// The players in a room, in the order they joined.
///
/// Maintains the host invariant: whenever the roster is nonempty, exactly
/// one player is host. The first player in becomes host; if the host
/// leaves, the earliest-joined remaining player takes over.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<Player>,
    next_seq: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player. The first player into an empty roster is host.
    ///
    /// # Errors
    /// Returns [`SessionError::DuplicateName`] if the name is taken.
    pub fn insert(&mut self, name: &str) -> Result<&Player, SessionError> {
        if self.get(name).is_some() {
            return Err(SessionError::DuplicateName(name.to_owned()));
        }
        let player = Player {
            name: name.to_owned(),
            is_host: self.players.is_empty(),
            has_guessed: false,
            current_guess: None,
            score: 0.0,
            join_seq: self.next_seq,
        };
        self.next_seq += 1;
        self.players.push(player);
        Ok(&self.players[self.players.len() - 1])
    }

    /// Removes a player, handing the host role on if needed.
    ///
    /// Returns the removed player, or `None` if no such player.
    pub fn remove(&mut self, name: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.name == name)?;
        let removed = self.players.remove(index);
        if removed.is_host {
            if let Some(next) = self.players.first_mut() {
                next.is_host = true;
            }
        }
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    /// The current host, if the roster is nonempty.
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    /// `true` when the roster is nonempty and every player has guessed.
    pub fn all_guessed(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.has_guessed)
    }

    /// Iterates players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
