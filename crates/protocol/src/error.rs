//! Protocol error types
//!
//! Errors that can occur when resolving a format or decoding a payload.

use thiserror::Error;

/// A payload could not be decoded under the flow's format
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not a JSON object
    #[error("invalid json record: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload does not match the binary schema
    #[error("invalid binary record: {0}")]
    Binary(#[from] prost::DecodeError),
}

/// A flow named a serialization format that does not exist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown serialization format '{name}' (expected one of: {})", crate::Format::NAMES.join(", "))]
pub struct UnknownFormat {
    /// The rejected name
    pub name: String,
}

impl UnknownFormat {
    /// Create an unknown format error
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
