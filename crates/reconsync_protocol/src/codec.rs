//! JSON encoding helpers for wire messages.

use crate::error::ProtocolResult;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a message to JSON bytes.
pub fn to_json_vec<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Encodes a message to a JSON string.
pub fn to_json_string<T: Serialize>(message: &T) -> ProtocolResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes a message from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decodes a message from a JSON string.
pub fn from_json_str<T: DeserializeOwned>(text: &str) -> ProtocolResult<T> {
    Ok(serde_json::from_str(text)?)
}
