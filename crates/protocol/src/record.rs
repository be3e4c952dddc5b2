//! Decoded records
//!
//! The binary schemas are protobuf messages declared by hand with
//! `prost::Message`; tags are part of the wire contract with the agent and
//! must not change.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::Format;

/// One decoded telemetry event
///
/// Serializes as a flat JSON object whatever the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    /// Arbitrary string-keyed values
    Dynamic(Map<String, Value>),
    /// Every socket field
    Full(FullRecord),
    /// Common subset of socket fields
    Compact(CompactRecord),
}

impl Record {
    /// Format this record was decoded from
    pub fn format(&self) -> Format {
        match self {
            Self::Dynamic(_) => Format::Dynamic,
            Self::Full(_) => Format::Full,
            Self::Compact(_) => Format::Compact,
        }
    }

    /// Render as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Render as a JSON value
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self::Dynamic(map)
    }
}

impl From<FullRecord> for Record {
    fn from(record: FullRecord) -> Self {
        Self::Full(record)
    }
}

impl From<CompactRecord> for Record {
    fn from(record: CompactRecord) -> Self {
        Self::Compact(record)
    }
}

/// Socket state sample with every collected field
#[derive(Clone, PartialEq, prost::Message, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FullRecord {
    #[prost(string, tag = "1")]
    pub task: String,
    #[prost(uint32, tag = "2")]
    #[serde(rename = "PID")]
    pub pid: u32,
    #[prost(string, tag = "3")]
    #[serde(rename = "SAddr")]
    pub saddr: String,
    #[prost(string, tag = "4")]
    #[serde(rename = "DAddr")]
    pub daddr: String,
    #[prost(uint32, tag = "5")]
    #[serde(rename = "SPort")]
    pub sport: u32,
    #[prost(uint32, tag = "6")]
    #[serde(rename = "DPort")]
    pub dport: u32,
    /// Smoothed round-trip time, microseconds
    #[prost(uint32, tag = "7")]
    #[serde(rename = "SRTT")]
    pub srtt: u32,
    #[prost(uint32, tag = "8")]
    #[serde(rename = "RTTVar")]
    pub rtt_var: u32,
    #[prost(uint32, tag = "9")]
    pub total_retrans: u32,
    #[prost(uint32, tag = "10")]
    pub snd_cwnd: u32,
    #[prost(uint64, tag = "11")]
    pub bytes_received: u64,
    #[prost(uint64, tag = "12")]
    pub bytes_acked: u64,
    #[prost(uint32, tag = "13")]
    pub segs_in: u32,
    #[prost(uint32, tag = "14")]
    pub segs_out: u32,
    #[prost(uint32, tag = "15")]
    pub lost_out: u32,
    #[prost(string, tag = "16")]
    pub old_state: String,
    #[prost(string, tag = "17")]
    pub new_state: String,
    #[prost(string, tag = "18")]
    pub hostname: String,
    /// Unix seconds
    #[prost(uint64, tag = "19")]
    pub timestamp: u64,
}

/// Socket state sample restricted to addresses, latency and retransmits
#[derive(Clone, PartialEq, prost::Message, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompactRecord {
    #[prost(string, tag = "3")]
    #[serde(rename = "SAddr")]
    pub saddr: String,
    #[prost(string, tag = "4")]
    #[serde(rename = "DAddr")]
    pub daddr: String,
    #[prost(uint32, tag = "6")]
    #[serde(rename = "DPort")]
    pub dport: u32,
    #[prost(uint32, tag = "7")]
    #[serde(rename = "SRTT")]
    pub srtt: u32,
    #[prost(uint32, tag = "9")]
    pub total_retrans: u32,
    #[prost(string, tag = "18")]
    pub hostname: String,
    #[prost(uint64, tag = "19")]
    pub timestamp: u64,
}
