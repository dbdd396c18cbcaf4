//! Wire protocol definitions
//!
//! Messages travel as newline-delimited JSON objects of the form
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};

/// One event on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Event name
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WireMessage {
    /// Create a new message
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Serialize message to JSON bytes with newline terminator
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = serde_json::to_vec(self).unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
