//! tcptrail Sources - ingress consumers
//!
//! An ingress consumer pulls raw telemetry from a message broker, decodes it
//! with the flow's serialization format and forwards `Record`s to an ingestion
//! queue.
//!
//! # Available Ingress Types
//!
//! - **kafka** - Consumer group on a Kafka topic (feature `kafka`)
//! - **memory** - Process-local broker for embedding and tests
//!
//! # Design Principles
//!
//! - **One unit per ingress**: own session, decode queue and worker pool; no
//!   global lock
//! - **Supervised sessions**: transient failures back off and retry until
//!   cancellation; a closed session is re-created
//! - **Explicit acknowledgement**: at-most-once or at-least-once per ingress
//! - **Contextual diagnostics**: every task logs through the configuration's
//!   diagnostics sink
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tcptrail_config::RunContext;
//! use tcptrail_sources::{IngressConsumer, IngressRegistry};
//!
//! let ctx = RunContext::new(config);
//! let consumer = IngressConsumer::new(Arc::new(IngressRegistry::new()));
//! let (tx, rx) = crossfire::mpmc::bounded_async(1000);
//!
//! let handle = consumer.start(&ctx, "kafka", "spb", tx).await?;
//! // ... read records from rx ...
//! handle.shutdown().await;
//! ```

mod backoff;
mod consumer;
mod error;
mod handoff;
#[cfg(feature = "kafka")]
mod kafka;
mod memory;
mod metrics;
mod registry;
mod session;
mod settings;

pub use backoff::Backoff;
pub use consumer::{IngressConsumer, IngressHandle};
pub use error::{IngressError, SessionError};
pub use handoff::{Ack, Commit, Delivery, Handoff, OffsetTracker};
#[cfg(feature = "kafka")]
pub use kafka::{KAFKA_KIND, KafkaSessionFactory};
pub use memory::{MEMORY_KIND, MemoryBroker, MemoryFault};
pub use metrics::{IngressMetrics, IngressMetricsSnapshot};
pub use registry::IngressRegistry;
pub use session::{ConsumerSession, ErrorSender, SessionFactory};
pub use settings::{
    AckPolicy, BackoffSettings, DEFAULT_GROUP_ID, DEFAULT_QUEUE_SIZE, DEFAULT_TOPIC,
    IngressSettings, SaslSettings,
};
