//! Wire format for push-channel frames.
//!
//! Every frame the server pushes is a JSON object `{"type": ..., "payload": ...}`.
//! The envelope is decoded here without interpreting the payload; which
//! `kind` values are recognized (and how their payloads decode) is decided
//! by the [`CollectionSchema`](crate::schema::CollectionSchema) in use.
//! Unrecognized kinds must survive decoding so they can be ignored
//! downstream rather than rejected here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded push frame: a message kind plus an uninterpreted payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl PushEnvelope {
    /// Parse a text frame into an envelope.
    ///
    /// Fails on non-JSON input, JSON that is not an object, or an object
    /// without a string `type` field. The payload is kept as raw JSON.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let envelope: Self = serde_json::from_str(text)?;
        Ok(envelope)
    }
}
