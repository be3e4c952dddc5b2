//! Ingress settings
//!
//! Read from the opaque `config` table of an `[ingress.<name>]` entry.
//!
//! ```toml
//! [ingress.kafka.config]
//! brokers = ["localhost:9092"]
//! topic = "tcptrail"
//! group_id = "tcptrail"
//! workers = 4
//! queue_size = 1
//! ack = "at_least_once"
//! backoff = { initial = "100ms", max = "10s" }
//! properties = { "fetch.min.bytes" = "1024" }
//!
//! [ingress.kafka.config.tls]
//! enable = true
//! ca_file = "ca.pem"
//!
//! [ingress.kafka.config.sasl]
//! mechanism = "SCRAM-SHA-256"
//! username = "tcptrail"
//! password = "secret"
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tcptrail_config::{ConfigError, EndpointSpec};
use tcptrail_tls::TlsMaterial;

/// Default consumer group
pub const DEFAULT_GROUP_ID: &str = "tcptrail";

/// Default topic
pub const DEFAULT_TOPIC: &str = "tcptrail";

/// Default decode queue capacity
pub const DEFAULT_QUEUE_SIZE: usize = 1;

/// When a message is marked as consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckPolicy {
    /// Mark right after the message is handed to the decode queue
    #[default]
    AtMostOnce,
    /// Mark after the decoded record reached the output queue
    AtLeastOnce,
}

/// Reconnect delay bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    /// First delay ceiling
    #[serde(with = "humantime_serde")]
    pub initial: Duration,

    /// Largest delay ceiling
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
        }
    }
}

/// SASL credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaslSettings {
    /// Mechanism (e.g. "PLAIN", "SCRAM-SHA-512")
    pub mechanism: String,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

/// Settings of one ingress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressSettings {
    /// Bootstrap brokers
    pub brokers: Vec<String>,

    /// Topic to consume
    pub topic: String,

    /// Consumer group
    pub group_id: String,

    /// Decode workers (0 is treated as 1)
    pub workers: usize,

    /// Decode queue capacity (0 is treated as 1)
    pub queue_size: usize,

    /// Acknowledgement policy
    pub ack: AckPolicy,

    /// Reconnect delays
    pub backoff: BackoffSettings,

    /// Transport security
    pub tls: TlsMaterial,

    /// SASL authentication
    pub sasl: Option<SaslSettings>,

    /// Extra client properties passed through verbatim
    pub properties: BTreeMap<String, String>,
}

impl Default for IngressSettings {
    fn default() -> Self {
        Self {
            brokers: Vec::new(),
            topic: DEFAULT_TOPIC.to_string(),
            group_id: DEFAULT_GROUP_ID.to_string(),
            workers: 1,
            queue_size: DEFAULT_QUEUE_SIZE,
            ack: AckPolicy::default(),
            backoff: BackoffSettings::default(),
            tls: TlsMaterial::default(),
            sasl: None,
            properties: BTreeMap::new(),
        }
    }
}

impl IngressSettings {
    /// Read and normalize the settings of an ingress declaration
    ///
    /// # Errors
    ///
    /// `ConfigError::Transform` when a setting has the wrong type.
    pub fn from_spec(spec: &EndpointSpec) -> Result<Self, ConfigError> {
        let settings: IngressSettings = spec
            .settings()
            .map_err(|e| ConfigError::transform("ingress", &spec.name, e))?;
        Ok(settings.normalized())
    }

    /// Clamp zero counts to 1 and keep `max >= initial`
    pub fn normalized(mut self) -> Self {
        self.workers = self.workers.max(1);
        self.queue_size = self.queue_size.max(1);
        if self.backoff.max < self.backoff.initial {
            self.backoff.max = self.backoff.initial;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_table() {
        let spec = EndpointSpec::new("kafka", "kafka");
        let settings = IngressSettings::from_spec(&spec).unwrap();

        assert_eq!(settings.group_id, DEFAULT_GROUP_ID);
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.queue_size, 1);
        assert_eq!(settings.ack, AckPolicy::AtMostOnce);
        assert_eq!(settings.backoff.initial, Duration::from_millis(100));
        assert!(!settings.tls.enable);
    }

    #[test]
    fn test_full_table() {
        let spec: EndpointSpec = toml::from_str(
            r#"
type = "kafka"

[config]
brokers = ["a:9092", "b:9092"]
topic = "sockets"
workers = 0
queue_size = 0
ack = "at_least_once"
backoff = { initial = "250ms", max = "1m" }
properties = { "fetch.min.bytes" = "1024" }

[config.sasl]
mechanism = "PLAIN"
username = "u"
password = "p"
"#,
        )
        .unwrap();

        let settings = IngressSettings::from_spec(&spec).unwrap();
        assert_eq!(settings.brokers, vec!["a:9092", "b:9092"]);
        assert_eq!(settings.topic, "sockets");
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.queue_size, 1);
        assert_eq!(settings.ack, AckPolicy::AtLeastOnce);
        assert_eq!(settings.backoff.initial, Duration::from_millis(250));
        assert_eq!(settings.backoff.max, Duration::from_secs(60));
        assert_eq!(settings.sasl.unwrap().mechanism, "PLAIN");
        assert_eq!(settings.properties["fetch.min.bytes"], "1024");
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let spec = EndpointSpec::new("kafka", "kafka").with_setting("workers", "four");
        let err = IngressSettings::from_spec(&spec).unwrap_err();
        assert!(matches!(err, ConfigError::Transform { component: "ingress", .. }));
    }

    #[test]
    fn test_backoff_max_below_initial() {
        let mut settings = IngressSettings::default();
        settings.backoff.initial = Duration::from_secs(5);
        settings.backoff.max = Duration::from_secs(1);
        assert_eq!(settings.normalized().backoff.max, Duration::from_secs(5));
    }
}
