use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Envelope carrying exactly one value across the stream.
///
/// The `type` field names the registered concrete type so the receiving
/// side can rebuild the value without a negotiated schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: serde_json::Value,
}

impl Packet {
    /// Create a packet from a wire type name and its JSON body.
    pub fn new(type_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }

    /// Serialize the envelope into a frame body.
    pub fn to_bytes(&self) -> Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|source| CodecError::Encode {
                type_name: self.type_name.clone(),
                source,
            })
    }

    /// Parse an envelope from a frame body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(CodecError::Decode)
    }
}
