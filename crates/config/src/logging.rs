//! `[log]` section shared by the agent and the server
//!
//! Says where tcptrail writes its own diagnostics, never the telemetry it
//! carries. `set_default` turns the section into a
//! [`Diagnostics`](crate::Diagnostics) sink; a missing section keeps `info`
//! console lines on stdout.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Most verbose level a sink lets through
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-message events from the decode workers
    Trace,
    /// Session and flow lifecycle detail
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Line format of the diagnostics sink
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per event, for log shippers
    Json,
}

/// Where diagnostics go
///
/// Any `output` other than `"stdout"` or `"stderr"` is a file path, opened
/// for append when the configuration is resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    #[serde(untagged)]
    File(String),
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
            Self::File(path) => f.write_str(path),
        }
    }
}

/// Diagnostics settings of an agent or server file
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// output = "/var/log/tcptrail/server.log"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
}
