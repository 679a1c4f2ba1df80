//! Parsing the join request carried in the connection URL.
//!
//! Clients connect to `/ws?name=<name>&room=<room>`. The browser
//! percent-encodes anything unusual in either value, so both are decoded
//! here before validation.

use serde::Deserialize;

use crate::{ProtocolError, RoomCode};

/// Longest display name accepted, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// Longest room code accepted, in characters.
pub const MAX_ROOM_CODE_LEN: usize = 64;

/// Who is joining, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub name: String,
    pub room: RoomCode,
}

/// The query string as sent. Other parameters are ignored.
#[derive(Deserialize)]
struct JoinQuery {
    name: Option<String>,
    room: Option<String>,
}

impl JoinRequest {
    /// Extracts `name` and `room` from a request target such as
    /// `/ws?name=Alice&room=ABC123`.
    ///
    /// The query is `application/x-www-form-urlencoded`: `+` is a space,
    /// `%XX` is a byte, and bytes that aren't UTF-8 decode to U+FFFD.
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidJoin` if either value is missing,
    /// blank, or too long, or if a parameter is given twice.
    pub fn from_request_target(target: &str) -> Result<Self, ProtocolError> {
        let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
        let JoinQuery { name, room } = serde_urlencoded::from_str(query)
            .map_err(|e| ProtocolError::InvalidJoin(e.to_string()))?;

        let name = required("name", name, MAX_NAME_LEN)?;
        let room = required("room", room, MAX_ROOM_CODE_LEN)?;
        Ok(Self {
            name,
            room: RoomCode::new(room),
        })
    }
}

fn required(field: &str, value: Option<String>, max_len: usize) -> Result<String, ProtocolError> {
    let value = value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProtocolError::InvalidJoin(format!("missing {field}")))?;
    if value.chars().count() > max_len {
        return Err(ProtocolError::InvalidJoin(format!(
            "{field} longer than {max_len} characters"
        )));
    }
    Ok(value.to_owned())
}
