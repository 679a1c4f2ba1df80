//! Frame encoding.
//!
//! The rest of the server only needs "something that turns values into
//! bytes and back". [`JsonCodec`] is the only implementation today because
//! browser clients speak JSON, but nothing above this module depends on
//! that choice.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns wire values into frame bytes and back.
///
/// One instance is shared by every connection task and room actor.
pub trait Codec: Send + Sync + 'static {
    /// Fails with `ProtocolError::Encode`.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Fails with `ProtocolError::Decode` on anything a player could send
    /// that isn't a well-formed `T`: truncated frames, wrong shapes, not
    /// the format at all.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Serializes a value into a UTF-8 string, for text frames.
    ///
    /// The default goes through [`encode`](Self::encode) and rejects
    /// output that is not valid UTF-8. Text formats should override it
    /// to skip the check.
    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes).map_err(|e| {
            ProtocolError::InvalidMessage(format!("encoded frame is not UTF-8: {e}"))
        })
    }
}

/// JSON frames, the format the browser client speaks.
///
/// ```rust
/// use pricetag_protocol::{ClientMessage, Codec, IntentFrame, JsonCodec};
///
/// let bytes = JsonCodec.encode(&IntentFrame::from(ClientMessage::Guess(42.5))).unwrap();
/// assert_eq!(bytes, br#"{"type":"GUESS","payload":42.5}"#);
///
/// let intent = ClientMessage::decode(&JsonCodec, &bytes).unwrap();
/// assert_eq!(intent, ClientMessage::Guess(42.5));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}
