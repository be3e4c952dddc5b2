//! Agent configuration
//!
//! The agent side describes which kernel tracepoints to sample, which socket
//! fields to collect for each, and where to send them.
//!
//! ```toml
//! [[tracepoints]]
//! name = "sock:inet_sock_set_state"
//! fields = "fields_01"
//! tcp_state = "TCP_CLOSE"
//! inet = [4, 6]
//! egress = "console"
//!
//! [fields]
//! fields_01 = [{ name = "SAddr" }, { name = "RTT" }]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::HasDiagnostics;
use crate::diagnostics::{Diagnostics, DiagnosticsSlot, MemorySink};
use crate::endpoint::{EndpointSpec, fill_names};
use crate::error::{ConfigError, Result};
use crate::logging::LogConfig;
use crate::validation;

/// Default tracepoint sampled by the agent
pub const DEFAULT_TRACEPOINT: &str = "sock:inet_sock_set_state";

/// Default number of workers per tracepoint
pub const DEFAULT_WORKERS: usize = 1;

/// One sampled tracepoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tracepoint {
    /// Kernel tracepoint identifier
    pub name: String,

    /// Name of the field-set to collect
    pub fields: String,

    /// TCP state filter (e.g. "TCP_CLOSE"); empty means all states
    pub tcp_state: String,

    /// Keep one sample out of `sample`; 0 keeps everything
    pub sample: u32,

    /// IP versions to capture (4, 6)
    pub inet: Vec<u8>,

    /// Name of the egress target
    pub egress: String,

    /// Worker count; 0 is replaced by 1 in `set_default`
    pub workers: usize,
}

/// One collected socket field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
    /// Field name (e.g. "SAddr", "RTT")
    pub name: String,

    /// Optional filter expression applied to the field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Optional arithmetic applied before export (e.g. "/ 1000")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub math: Option<String>,
}

impl Field {
    /// Field with just a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracepoints, in declaration order
    pub tracepoints: Vec<Tracepoint>,

    /// Field-sets by name
    pub fields: BTreeMap<String, Vec<Field>>,

    /// Egress targets by name
    pub egress: BTreeMap<String, EndpointSpec>,

    /// Diagnostics configuration
    pub log: LogConfig,

    #[serde(skip)]
    pub(crate) diagnostics: DiagnosticsSlot,
}

impl Config {
    /// Load and validate an agent configuration file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(s)?;
        fill_names(config.egress.iter_mut());
        config.validate()?;
        Ok(config)
    }

    /// Check tracepoint values
    pub fn validate(&self) -> Result<()> {
        validation::validate_agent(self)
    }

    /// Fill unset values and attach the diagnostics sink described by `[log]`
    ///
    /// Zero worker counts become 1. Calling it again changes nothing.
    pub fn set_default(&mut self) -> Result<()> {
        for tracepoint in &mut self.tracepoints {
            if tracepoint.workers == 0 {
                tracepoint.workers = DEFAULT_WORKERS;
            }
        }

        self.diagnostics
            .ensure(&self.log)
            .map_err(|e| ConfigError::io(self.log.output.to_string(), e))
    }

    /// Names of the fields in a field-set, in order
    ///
    /// Unknown field-sets yield an empty list.
    pub fn tracepoint_fields(&self, name: &str) -> Vec<&str> {
        self.fields
            .get(name)
            .map(|fields| fields.iter().map(|f| f.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Replace the diagnostics sink
    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics.replace(diagnostics);
    }

    /// Attach a buffering sink and return a handle to query it
    pub fn attach_memory_sink(&mut self) -> MemorySink {
        let (diagnostics, sink) = Diagnostics::memory();
        self.set_diagnostics(diagnostics);
        sink
    }

    /// Whether a diagnostics sink is attached
    pub fn has_diagnostics(&self) -> bool {
        self.diagnostics.is_set()
    }
}

impl HasDiagnostics for Config {
    fn diagnostics(&self) -> &Diagnostics {
        self.diagnostics.get_or_default(&self.log)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACEPOINT: &str = r#"
[[tracepoints]]
name = "sock:inet_sock_set_state"
fields = "fields_01"
tcp_state = "TCP_CLOSE"
sample = 0
inet = [4, 6]
egress = "console"
"#;

    #[test]
    fn test_load_tracepoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, TRACEPOINT).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.tracepoints.len(), 1);
        assert_eq!(config.tracepoints[0].name, "sock:inet_sock_set_state");
        assert_eq!(config.tracepoints[0].fields, "fields_01");
        assert_eq!(config.tracepoints[0].inet, vec![4, 6]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::from_file("not_exist"),
            Err(ConfigError::IoError { .. })
        ));
    }

    #[test]
    fn test_load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, format!("{TRACEPOINT}\t\nabcde\n")).unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_tracepoint_fields_order() {
        let mut config = Config::default();
        config.fields.insert(
            "foo".into(),
            vec![Field::named("f1"), Field::named("f2")],
        );

        assert_eq!(config.tracepoint_fields("foo"), vec!["f1", "f2"]);
        assert!(config.tracepoint_fields("bar").is_empty());
    }

    #[test]
    fn test_field_set_with_options() {
        let toml = r#"
[fields]
fields_01 = [{ name = "RTT", math = "/ 1000" }, { name = "SAddr" }]
"#;
        let config = Config::from_str(toml).unwrap();
        let set = &config.fields["fields_01"];
        assert_eq!(set[0].math.as_deref(), Some("/ 1000"));
        assert_eq!(set[1], Field::named("SAddr"));
    }

    #[test]
    fn test_set_default() {
        let mut config = Config {
            tracepoints: vec![Tracepoint {
                name: "foo".into(),
                ..Default::default()
            }],
            ..Default::default()
        };

        config.set_default().unwrap();
        assert_eq!(config.tracepoints[0].workers, 1);
        assert!(config.has_diagnostics());

        config.set_default().unwrap();
        assert_eq!(config.tracepoints[0].workers, 1);
        assert_eq!(config.diagnostics().sink_kind(), "stdout");
    }

    #[test]
    fn test_set_default_keeps_explicit_workers() {
        let mut config = Config {
            tracepoints: vec![Tracepoint {
                workers: 4,
                ..Default::default()
            }],
            ..Default::default()
        };
        config.set_default().unwrap();
        assert_eq!(config.tracepoints[0].workers, 4);
    }

    #[test]
    fn test_egress_names_filled() {
        let toml = r#"
[egress.kafka]
type = "kafka"
config = { brokers = ["localhost:9092"], topic = "tcptrail" }
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.egress["kafka"].name, "kafka");
        assert_eq!(config.egress["kafka"].kind, "kafka");
    }
}
