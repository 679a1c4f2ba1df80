//! Room registry: opens rooms on demand and closes them when they empty.

use std::collections::HashMap;
use std::sync::Arc;

use pricetag_protocol::{Codec, JsonCodec, RoomCode};
use pricetag_session::Catalog;
use pricetag_transport::ConnectionId;

use crate::room::spawn_room;
use crate::{PlayerConnection, RoomConfig, RoomError, RoomHandle};

/// Reason sent to players when the registry closes their room.
const ROOM_CLOSED: &str = "room closed";

/// Every open room, keyed by room code.
///
/// There is no explicit "create room": joining an unknown code opens it,
/// and the joiner becomes its host. When the last player leaves, the room
/// is shut down and its code is free again.
///
/// The registry itself is plain data. The server keeps it behind a
/// `tokio::sync::Mutex` and only takes the lock to join or leave; a
/// player's intents go straight to the [`RoomHandle`] returned by
/// [`join`](Self::join).
pub struct RoomRegistry<C: Codec = JsonCodec> {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: RoomConfig,
    catalog: Catalog,
    codec: Arc<C>,
}

impl<C: Codec> RoomRegistry<C> {
    /// Creates an empty registry. Every room it opens gets its own copy of
    /// `catalog`'s items.
    pub fn new(config: RoomConfig, catalog: Catalog, codec: C) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            catalog,
            codec: Arc::new(codec),
        }
    }

    /// Seats a player in `room`, opening it first if the code is unknown.
    ///
    /// Returns the room's handle for the player's intents. If the room's
    /// actor turns out to have stopped, the registry replaces it with a
    /// fresh room and seats the player there.
    pub async fn join(
        &mut self,
        room: &RoomCode,
        connection: PlayerConnection,
    ) -> Result<RoomHandle, RoomError> {
        let (handle, opened) = self.get_or_open(room);
        let result = match handle.join(connection.clone()).await {
            Err(RoomError::Unavailable(_)) if !opened => {
                tracing::warn!(room = %room, "room actor gone, replacing it");
                self.rooms.remove(room);
                let (handle, _) = self.get_or_open(room);
                handle.join(connection).await.map(|()| handle)
            }
            other => other.map(|()| handle),
        };

        if result.is_err() {
            self.close_if_empty(room).await;
        }
        result
    }

    /// Removes the player seated through `connection_id` from `room`.
    ///
    /// Returns the number of players left. A room left empty is shut down
    /// and removed.
    pub async fn leave(
        &mut self,
        room: &RoomCode,
        name: &str,
        connection_id: ConnectionId,
    ) -> Result<usize, RoomError> {
        let handle = self
            .rooms
            .get(room)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room.clone()))?;

        let remaining = match handle.leave(name, connection_id).await {
            Ok(remaining) => remaining,
            Err(e @ RoomError::Unavailable(_)) => {
                self.rooms.remove(room);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if remaining == 0 {
            self.rooms.remove(room);
            let _ = handle.shutdown(ROOM_CLOSED).await;
            tracing::info!(room = %room, "room destroyed");
        }
        Ok(remaining)
    }

    /// Shuts a room down, closing every connection in it with `reason`.
    pub async fn destroy(&mut self, room: &RoomCode, reason: &str) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room)
            .ok_or_else(|| RoomError::NotFound(room.clone()))?;

        let _ = handle.shutdown(reason).await;
        tracing::info!(room = %room, %reason, "room destroyed");
        Ok(())
    }

    /// Shuts every room down. Used when the server stops.
    pub async fn shutdown_all(&mut self, reason: &str) {
        let count = self.rooms.len();
        for (_, handle) in self.rooms.drain() {
            let _ = handle.shutdown(reason).await;
        }
        tracing::info!(rooms = count, %reason, "all rooms shut down");
    }

    /// Returns a handle to an open room.
    pub fn get(&self, room: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(room).cloned()
    }

    /// Returns the number of open rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists the codes of all open rooms, sorted.
    pub fn room_codes(&self) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = self.rooms.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    fn get_or_open(&mut self, room: &RoomCode) -> (RoomHandle, bool) {
        if let Some(handle) = self.rooms.get(room).filter(|h| !h.is_closed()) {
            return (handle.clone(), false);
        }

        let items = self.catalog.assemble(self.config.shuffle_items);
        let handle = spawn_room(room.clone(), self.config.clone(), items, Arc::clone(&self.codec));
        self.rooms.insert(room.clone(), handle.clone());
        tracing::info!(room = %room, "room created");
        (handle, true)
    }

    /// Drops a room nobody ended up joining.
    async fn close_if_empty(&mut self, room: &RoomCode) {
        let Some(handle) = self.rooms.get(room).cloned() else {
            return;
        };
        let empty = match handle.snapshot().await {
            Ok(snapshot) => snapshot.players.is_empty(),
            Err(_) => true,
        };
        if empty {
            self.rooms.remove(room);
            let _ = handle.shutdown(ROOM_CLOSED).await;
            tracing::debug!(room = %room, "closed room left empty by a refused join");
        }
    }
}

impl Default for RoomRegistry<JsonCodec> {
    fn default() -> Self {
        Self::new(RoomConfig::default(), Catalog::builtin(), JsonCodec)
    }
}
