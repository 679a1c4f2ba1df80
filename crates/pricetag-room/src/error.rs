//! Error types for the room layer.

use pricetag_protocol::RoomCode;

/// Why a room refused a join or leave.
///
/// Every variant leaves the room's session unchanged. A refused join is
/// reported to the player by closing their connection with this error's
/// text as the reason.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    /// No room with this code is open.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room has reached its player limit.
    #[error("room {0} is full")]
    Full(RoomCode),

    /// The room's game is over. Nobody joins until the host resets it.
    #[error("room {0} has finished its game and is not accepting players")]
    Locked(RoomCode),

    /// Another player in the room already uses this name.
    #[error("name {name:?} is already taken in room {room}")]
    NameTaken { name: String, room: RoomCode },

    /// The player is not in this room, or is in it through a different
    /// connection.
    #[error("{name:?} is not in room {room}")]
    NotInRoom { name: String, room: RoomCode },

    /// The room's actor has stopped or its command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
