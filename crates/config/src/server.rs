//! Server (aggregator) configuration
//!
//! The server has no ad-hoc mode: everything comes from a TOML file.
//!
//! ```toml
//! [ingress.kafka]
//! type = "kafka"
//! config = { brokers = ["localhost:9092"], topic = "tcptrail" }
//!
//! [ingestion.console]
//! type = "stdout"
//!
//! [geo]
//! type = "maxmind"
//!
//! [[flow]]
//! ingress = "kafka"
//! ingestion = "console"
//! serialization = "spb"
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
use crate::global::GlobalConfig;
use crate::logging::LogConfig;
use crate::validation;

/// Binding of one ingress to one ingestion under one serialization format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowBinding {
    /// Name of an `[ingress.<name>]` entry
    pub ingress: String,

    /// Name of an `[ingestion.<name>]` entry
    pub ingestion: String,

    /// Wire format of the ingress payloads ("json", "pb", "spb")
    pub serialization: String,
}

impl FlowBinding {
    /// Create a binding
    pub fn new(
        ingress: impl Into<String>,
        ingestion: impl Into<String>,
        serialization: impl Into<String>,
    ) -> Self {
        Self {
            ingress: ingress.into(),
            ingestion: ingestion.into(),
            serialization: serialization.into(),
        }
    }
}

/// Server configuration
///
/// Built once at startup, then shared read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Settings shared by all flows
    pub global: GlobalConfig,

    /// Diagnostics configuration
    pub log: LogConfig,

    /// Ingress sources by name
    pub ingress: BTreeMap<String, EndpointSpec>,

    /// Ingestion sinks by name
    pub ingestion: BTreeMap<String, EndpointSpec>,

    /// Geo enrichment lookup
    pub geo: EndpointSpec,

    /// Flow bindings, in declaration order
    pub flow: Vec<FlowBinding>,

    #[serde(skip)]
    diagnostics: DiagnosticsSlot,
}

impl ServerConfig {
    /// Load and validate a server configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid TOML, or a flow
    /// references an undeclared ingress or ingestion.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let mut config: ServerConfig = toml::from_str(s)?;
        fill_names(config.ingress.iter_mut());
        fill_names(config.ingestion.iter_mut());
        config.geo.name = "geo".into();
        config.validate()?;
        Ok(config)
    }

    /// Check the flow table and endpoint declarations
    pub fn validate(&self) -> Result<()> {
        validation::validate_server(self)
    }

    /// Fill unset values and attach the diagnostics sink described by `[log]`
    ///
    /// Calling it again changes nothing.
    pub fn set_default(&mut self) -> Result<()> {
        self.diagnostics
            .ensure(&self.log)
            .map_err(|e| ConfigError::io(self.log.output.to_string(), e))
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

    /// Ingestion names referenced by at least one flow, in first-use order
    pub fn referenced_ingestions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for binding in &self.flow {
            if !names.contains(&binding.ingestion.as_str()) {
                names.push(binding.ingestion.as_str());
            }
        }
        names
    }
}

impl HasDiagnostics for ServerConfig {
    fn diagnostics(&self) -> &Diagnostics {
        self.diagnostics.get_or_default(&self.log)
    }
}

impl FromStr for ServerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
