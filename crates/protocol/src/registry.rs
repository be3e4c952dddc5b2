//! Format resolution
//!
//! A flow resolves its format name once, when it is built. Workers then hold a
//! `Decoder` and never look the name up again.

use prost::Message;
use serde_json::{Map, Value};

use crate::Result;
use crate::error::UnknownFormat;
use crate::record::{CompactRecord, FullRecord, Record};
use crate::schema::Format;

/// Lookup of decoders by serialization name
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializationRegistry;

impl SerializationRegistry {
    /// Resolve a format name into a decoder
    ///
    /// # Errors
    ///
    /// Returns `UnknownFormat` for any name outside [`Format::NAMES`].
    pub fn resolve(name: &str) -> std::result::Result<Decoder, UnknownFormat> {
        name.parse::<Format>().map(Decoder::new)
    }

    /// Check a format name without building a decoder
    #[inline]
    pub fn is_known(name: &str) -> bool {
        Format::from_name(name).is_some()
    }

    /// Every accepted format name
    #[inline]
    pub fn names() -> &'static [&'static str] {
        Format::NAMES
    }
}

/// Decoder bound to one format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    format: Format,
}

impl Decoder {
    /// Create a decoder for a format
    #[inline]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Format this decoder reads
    #[inline]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Decode one payload
    ///
    /// # Errors
    ///
    /// `DecodeError::Json` when a dynamic payload is not a JSON object,
    /// `DecodeError::Binary` when a binary payload is malformed.
    pub fn decode(&self, payload: &[u8]) -> Result<Record> {
        let record = match self.format {
            Format::Dynamic => Record::Dynamic(serde_json::from_slice::<Map<String, Value>>(payload)?),
            Format::Full => Record::Full(FullRecord::decode(payload)?),
            Format::Compact => Record::Compact(CompactRecord::decode(payload)?),
        };
        Ok(record)
    }
}
