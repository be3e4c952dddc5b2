//! tcptrail Configuration
//!
//! TOML-based configuration for both halves of tcptrail, plus the pieces every
//! component receives alongside it: a per-configuration diagnostics sink and an
//! explicit run context.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tcptrail_config::ServerConfig;
//! use std::str::FromStr;
//!
//! let config = ServerConfig::from_str("[ingestion.console]\ntype = \"stdout\"").unwrap();
//! assert_eq!(config.ingestion["console"].kind, "stdout");
//! ```
//!
//! # Resolution
//!
//! Binaries call [`get`] (agent) or [`get_server`] (server) with their process
//! arguments. Both return a configuration with defaults applied and a
//! diagnostics sink attached.
//!
//! # Example Server Config
//!
//! ```toml
//! [global]
//! output_queue_size = 1000
//!
//! [log]
//! level = "info"
//! format = "json"
//! output = "stderr"
//!
//! [ingress.kafka]
//! type = "kafka"
//! config = { brokers = ["localhost:9092"], topic = "tcptrail", workers = 4 }
//!
//! [ingestion.console]
//! type = "stdout"
//!
//! [[flow]]
//! ingress = "kafka"
//! ingestion = "console"
//! serialization = "spb"
//! ```

mod agent;
mod cli;
mod context;
mod diagnostics;
mod endpoint;
mod error;
mod global;
mod logging;
mod resolve;
mod server;
mod transform;
mod validation;

pub use agent::{Config, DEFAULT_TRACEPOINT, DEFAULT_WORKERS, Field, Tracepoint};
pub use cli::{AgentArgs, CLI_FIELD_SET, CliRequest, ServerArgs, cli_to_config};
pub use context::{HasDiagnostics, RunContext};
pub use diagnostics::{Diagnostics, MemorySink, MemoryWriter};
pub use endpoint::EndpointSpec;
pub use error::{ConfigError, Result, TransformError};
pub use global::{DEFAULT_OUTPUT_QUEUE_SIZE, GlobalConfig};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use resolve::{get, get_server};
pub use server::{FlowBinding, ServerConfig};
pub use transform::{transform, transform_into};
pub use validation::{validate_agent, validate_flows, validate_server};
