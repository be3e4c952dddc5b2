//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error returned when a generic value cannot be copied into a typed shape
#[derive(Debug, Error)]
pub enum TransformError {
    /// Source value is not a table (string, number, array, ...)
    #[error("expected a table, found {found}")]
    NotATable {
        /// TOML type name of the rejected value
        found: &'static str,
    },

    /// A matching field had a value of the wrong type
    #[error("field type mismatch: {0}")]
    Mismatch(#[from] toml::de::Error),

    /// The target could not be represented as a table
    #[error("target is not table-shaped: {0}")]
    Target(#[from] toml::ser::Error),
}

/// Errors that can occur when resolving or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Endpoint settings could not be transformed into their typed form
    #[error("invalid settings for {component} '{name}': {source}")]
    Transform {
        /// Component type (e.g., "ingress")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Underlying transform error
        #[source]
        source: TransformError,
    },

    /// Command line could not be parsed (also carries --help / --version output)
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// Server mode was started without a configuration file
    #[error("a configuration file is required (--config <path>)")]
    MissingConfigFlag,

    /// Agent mode was started without a file and without ad-hoc flags
    #[error("no configuration: pass --config <path> or at least one of --fields, --state, --egress, --tracepoint, --sample, --workers, -4, -6")]
    NoConfiguration,

    /// Flow references an ingress that is not declared
    #[error("flow #{index} references unknown ingress '{name}'")]
    UnknownIngress {
        /// Position of the flow binding
        index: usize,
        /// Name of the missing ingress
        name: String,
    },

    /// Flow references an ingestion that is not declared
    #[error("flow #{index} references unknown ingestion '{name}'")]
    UnknownIngestion {
        /// Position of the flow binding
        index: usize,
        /// Name of the missing ingestion
        name: String,
    },

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "flow", "ingress")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an IoError for the given path
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create a Transform error
    pub fn transform(component: &'static str, name: impl Into<String>, source: TransformError) -> Self {
        Self::Transform {
            component,
            name: name.into(),
            source,
        }
    }

    /// Create an UnknownIngress error
    pub fn unknown_ingress(index: usize, name: impl Into<String>) -> Self {
        Self::UnknownIngress {
            index,
            name: name.into(),
        }
    }

    /// Create an UnknownIngestion error
    pub fn unknown_ingestion(index: usize, name: impl Into<String>) -> Self {
        Self::UnknownIngestion {
            index,
            name: name.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}
