//! tcptrail Pipeline
//!
//! The flow router that connects ingress consumers to ingestion queues.
//!
//! # Architecture
//!
//! ```text
//! [Ingress]                 [Consumers]                  [Ingestion queues]
//!    kafka ──┐
//!            ├──→ decode (json | pb | spb) ──→ Record ──→ mpmc "console"
//!    memory ─┘                                      └──→ mpmc "elasticsearch"
//! ```
//!
//! # Key Design
//!
//! - **Validate first**: names, formats and ingress types are checked before
//!   any consumer starts
//! - **One queue per ingestion**: bounded by `global.output_queue_size`; flows
//!   sharing an ingestion fan in to the same queue
//! - **Explicit context**: configuration and cancellation arrive through
//!   `RunContext`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tcptrail_pipeline::FlowRouter;
//! use tcptrail_sources::IngressRegistry;
//!
//! let router = FlowRouter::new(Arc::new(IngressRegistry::new()));
//! let mut flows = router.start(&ctx).await?;
//! let console = flows.take_output("console").unwrap();
//!
//! while let Ok(record) = console.recv().await {
//!     println!("{}", record.to_json_line()?);
//! }
//! ```

mod error;
mod flow;

pub use error::{PipelineError, Result};
pub use flow::{FlowMetrics, FlowRouter, Flows};

#[cfg(test)]
mod flow_test;
