//! Named endpoint declarations
//!
//! Ingress sources, ingestion sinks, agent egress targets and the geo lookup
//! all share one shape: a type tag plus an opaque settings table that only the
//! matching adapter knows how to read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::error::TransformError;
use crate::transform::transform;

/// Declaration of an adapter endpoint
///
/// ```toml
/// [ingress.kafka]
/// type = "kafka"
///
/// [ingress.kafka.config]
/// brokers = ["localhost:9092"]
/// topic = "tcptrail"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSpec {
    /// Name of the endpoint, taken from its table key
    #[serde(skip)]
    pub name: String,

    /// Adapter type tag (e.g. "kafka", "elasticsearch", "maxmind")
    #[serde(rename = "type")]
    pub kind: String,

    /// Adapter-specific settings
    pub config: Table,
}

impl EndpointSpec {
    /// Create an endpoint with empty settings
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            config: Table::new(),
        }
    }

    /// Add a setting (builder style)
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Read the settings table into the adapter's typed settings
    pub fn settings<T: DeserializeOwned>(&self) -> Result<T, TransformError> {
        transform(&Value::Table(self.config.clone()))
    }

    /// Look up a single raw setting
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }
}

/// Copy map keys into the `name` field of each endpoint
pub(crate) fn fill_names<'a>(endpoints: impl IntoIterator<Item = (&'a String, &'a mut EndpointSpec)>) {
    for (name, endpoint) in endpoints {
        endpoint.name.clone_from(name);
    }
}
