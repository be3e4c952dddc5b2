//! Serialization format names
//!
//! The format is part of the flow declaration. Names are matched exactly.

use std::fmt;
use std::str::FromStr;

use crate::error::UnknownFormat;

/// Wire format of an ingress payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON object, kept as a string-keyed map
    Dynamic,
    /// Binary schema with every socket field
    Full,
    /// Binary schema with the common subset of fields
    Compact,
}

impl Format {
    /// Every accepted name, canonical names first
    pub const NAMES: &'static [&'static str] = &["json", "pb", "spb", "dynamic", "full", "compact"];

    /// Parse a format name
    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" | "dynamic" => Some(Self::Dynamic),
            "pb" | "full" => Some(Self::Full),
            "spb" | "compact" => Some(Self::Compact),
            _ => None,
        }
    }

    /// Canonical name of this format
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dynamic => "json",
            Self::Full => "pb",
            Self::Compact => "spb",
        }
    }

    /// Check if payloads use a binary schema
    #[inline]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Full | Self::Compact)
    }
}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownFormat::new(s))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
