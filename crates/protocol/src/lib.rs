//! tcptrail Protocol - records and the decoders that produce them
//!
//! This crate provides the types that flow from ingress to ingestion:
//! - `Record` - One decoded telemetry event (dynamic, full or compact)
//! - `Format` - The closed set of wire formats a flow can declare
//! - `SerializationRegistry` - Resolves a format name to a `Decoder` once, at
//!   flow construction
//!
//! # Formats
//!
//! | Name                | Record            | Encoding                  |
//! |---------------------|-------------------|---------------------------|
//! | `json`, `dynamic`   | `Record::Dynamic` | JSON object               |
//! | `pb`, `full`        | `Record::Full`    | protobuf, all fields      |
//! | `spb`, `compact`    | `Record::Compact` | protobuf, same tags, fewer|
//!
//! The binary schemas share field tags, so a compact decoder reading a full
//! payload keeps the common fields and skips the rest.

mod error;
mod record;
mod registry;
mod schema;

pub use error::{DecodeError, UnknownFormat};
pub use record::{CompactRecord, FullRecord, Record};
pub use registry::{Decoder, SerializationRegistry};
pub use schema::Format;

/// Result type for decode operations
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod record_test;
#[cfg(test)]
mod schema_test;
