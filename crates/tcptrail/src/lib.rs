//! tcptrail - TCP telemetry ingestion and routing
//!
//! Library half of the `tcptrail-agent` and `tcptrail-server` binaries.
//!
//! # Usage
//!
//! ```bash
//! # Agent with an ad-hoc configuration
//! tcptrail-agent -f SAddr,DAddr,RTT -s TCP_CLOSE -e console
//!
//! # Agent from a file
//! tcptrail-agent --config configs/agent.toml
//!
//! # Server (a file is mandatory)
//! tcptrail-server --config configs/server.toml
//! ```

pub mod cmd;
pub mod ingestion;

pub use cmd::agent::render;
pub use cmd::serve::Server;
