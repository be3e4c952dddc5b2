//! Pipeline error types
//!
//! Every variant is raised before or while starting flows; nothing here is a
//! runtime error.

use tcptrail_config::ConfigError;
use tcptrail_protocol::UnknownFormat;
use tcptrail_sources::IngressError;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Flow table references undeclared endpoints
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Flow declares a serialization format that does not exist
    #[error("flow #{index}: {source}")]
    UnknownFormat {
        /// Position of the flow binding
        index: usize,
        /// Underlying format error
        #[source]
        source: UnknownFormat,
    },

    /// Flow's ingress has a type no session factory serves
    #[error("flow #{index}: ingress '{ingress}' has unsupported type '{kind}'")]
    UnsupportedIngressType {
        /// Position of the flow binding
        index: usize,
        /// Ingress name
        ingress: String,
        /// Declared type tag
        kind: String,
    },

    /// An ingress consumer failed to start
    #[error("flow #{index}: {source}")]
    Ingress {
        /// Position of the flow binding
        index: usize,
        /// Underlying ingress error
        #[source]
        source: IngressError,
    },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
