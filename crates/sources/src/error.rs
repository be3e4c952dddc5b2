//! Ingress error types

use tcptrail_config::ConfigError;
use tcptrail_protocol::UnknownFormat;
use tcptrail_tls::CredentialError;
use thiserror::Error;

/// Failure reported by a consumer session
///
/// Everything except `QueueClosed` is retried by the supervising task.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session could not be created
    #[error("session setup failed: {0}")]
    Setup(String),

    /// Transient failure while consuming (broker unreachable, rebalance, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The session is gone and must be re-created
    #[error("session closed")]
    Closed,

    /// The decode queue has no receivers left
    #[error("decode queue closed")]
    QueueClosed,

    /// TLS material named by the settings is unusable
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// librdkafka error
    #[cfg(feature = "kafka")]
    #[error("kafka: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

impl SessionError {
    /// Create a Setup error
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }

    /// Create a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Failure to start an ingress consumer
#[derive(Debug, Error)]
pub enum IngressError {
    /// No `[ingress.<name>]` entry
    #[error("ingress '{0}' is not declared")]
    UnknownIngress(String),

    /// No session factory for the declared type
    #[error("ingress '{name}' has unsupported type '{kind}'")]
    UnsupportedType {
        /// Ingress name
        name: String,
        /// Declared type tag
        kind: String,
    },

    /// Settings table could not be read
    #[error(transparent)]
    Settings(#[from] ConfigError),

    /// Flow declared an unknown serialization format
    #[error(transparent)]
    Format(#[from] UnknownFormat),

    /// First session could not be opened
    #[error("ingress '{name}' failed to open: {source}")]
    Open {
        /// Ingress name
        name: String,
        /// Underlying session error
        #[source]
        source: SessionError,
    },
}

impl IngressError {
    /// Create an UnsupportedType error
    pub fn unsupported(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnsupportedType {
            name: name.into(),
            kind: kind.into(),
        }
    }
}
