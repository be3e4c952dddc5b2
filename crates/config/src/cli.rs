//! Command-line surface
//!
//! The agent accepts either a configuration file or a handful of shorthand
//! flags describing a single tracepoint. The server only takes a file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;

use crate::agent::{Config, DEFAULT_TRACEPOINT, DEFAULT_WORKERS, Field, Tracepoint};

/// Field-set name used for flags given on the command line
pub const CLI_FIELD_SET: &str = "cli";

/// tcptrail agent - samples TCP socket state and ships it to an egress
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tcptrail-agent", about, long_about = None)]
pub struct AgentArgs {
    /// Path to configuration file (overrides every other flag)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Kernel tracepoint to sample [default: sock:inet_sock_set_state]
    #[arg(short, long)]
    pub tracepoint: Option<String>,

    /// Comma-separated list of fields (e.g. SAddr,DAddr,RTT)
    #[arg(short, long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// TCP state filter (e.g. TCP_CLOSE)
    #[arg(short = 's', long = "state")]
    pub tcp_state: Option<String>,

    /// Egress target name
    #[arg(short, long)]
    pub egress: Option<String>,

    /// Keep one sample out of N, 0 keeps everything [default: 0]
    #[arg(long)]
    pub sample: Option<u32>,

    /// Worker count [default: 1]
    #[arg(long)]
    pub workers: Option<usize>,

    /// Capture IPv4 sockets
    #[arg(short = '4')]
    pub ipv4: bool,

    /// Capture IPv6 sockets
    #[arg(short = '6')]
    pub ipv6: bool,
}

impl AgentArgs {
    /// Shorthand request built from the flags, if any shorthand flag was given
    ///
    /// Every flag except `--config` counts, `-4`, `-6`, `--sample` and
    /// `--workers` included.
    pub fn request(&self) -> Option<CliRequest> {
        let adhoc = !self.fields.is_empty()
            || self.tcp_state.is_some()
            || self.egress.is_some()
            || self.tracepoint.is_some()
            || self.sample.is_some()
            || self.workers.is_some()
            || self.ipv4
            || self.ipv6;
        if !adhoc {
            return None;
        }

        Some(CliRequest {
            fields: self
                .fields
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
            tcp_state: self.tcp_state.clone().unwrap_or_default(),
            egress: self.egress.clone().unwrap_or_default(),
            tracepoint: self
                .tracepoint
                .clone()
                .unwrap_or_else(|| DEFAULT_TRACEPOINT.to_string()),
            sample: self.sample.unwrap_or_default(),
            workers: self.workers.unwrap_or(DEFAULT_WORKERS),
            ipv4: self.ipv4,
            ipv6: self.ipv6,
        })
    }
}

/// tcptrail server - consumes telemetry and routes it to ingestion sinks
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tcptrail-server", about, long_about = None)]
pub struct ServerArgs {
    /// Path to configuration file (required)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Shorthand description of a single tracepoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliRequest {
    /// Field names, in order
    pub fields: Vec<String>,
    /// TCP state filter
    pub tcp_state: String,
    /// Egress target name
    pub egress: String,
    /// Tracepoint name
    pub tracepoint: String,
    /// Sampling rate
    pub sample: u32,
    /// Worker count
    pub workers: usize,
    /// Capture IPv4
    pub ipv4: bool,
    /// Capture IPv6
    pub ipv6: bool,
}

/// Build an agent configuration with one tracepoint from shorthand flags
///
/// Fields land in the `"cli"` field-set in the order given. With neither IP
/// version selected the tracepoint captures IPv4.
pub fn cli_to_config(request: &CliRequest) -> Config {
    let mut inet = Vec::with_capacity(2);
    if request.ipv4 || !request.ipv6 {
        inet.push(4);
    }
    if request.ipv6 {
        inet.push(6);
    }

    let mut fields = BTreeMap::new();
    fields.insert(
        CLI_FIELD_SET.to_string(),
        request.fields.iter().map(Field::named).collect(),
    );

    Config {
        tracepoints: vec![Tracepoint {
            name: request.tracepoint.clone(),
            fields: CLI_FIELD_SET.to_string(),
            tcp_state: request.tcp_state.clone(),
            sample: request.sample,
            inet,
            egress: request.egress.clone(),
            workers: request.workers,
        }],
        fields,
        ..Default::default()
    }
}
