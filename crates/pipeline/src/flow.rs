//! Flow router - binds ingress consumers to ingestion queues
//!
//! Starting is all-or-nothing for configuration mistakes: the whole flow table
//! is checked before the first consumer is started. A consumer that fails to
//! open its first session stops the ones already started.

use std::collections::HashMap;
use std::sync::Arc;

use crossfire::{MAsyncRx, MAsyncTx};
use tcptrail_config::{FlowBinding, RunContext, ServerConfig, validate_flows};
use tcptrail_protocol::{Record, SerializationRegistry};
use tcptrail_sources::{IngressConsumer, IngressHandle, IngressMetricsSnapshot, IngressRegistry};

use crate::error::{PipelineError, Result};

/// Starts every flow of a server configuration
#[derive(Debug, Clone)]
pub struct FlowRouter {
    registry: Arc<IngressRegistry>,
}

impl FlowRouter {
    /// Create a router over a session factory registry
    pub fn new(registry: Arc<IngressRegistry>) -> Self {
        Self { registry }
    }

    /// Check the flow table without starting anything
    ///
    /// # Errors
    ///
    /// Dangling ingress or ingestion names, unknown formats, or ingress types
    /// without a registered session factory.
    pub fn validate(&self, config: &ServerConfig) -> Result<()> {
        validate_flows(config)?;

        for (index, binding) in config.flow.iter().enumerate() {
            SerializationRegistry::resolve(&binding.serialization)
                .map_err(|source| PipelineError::UnknownFormat { index, source })?;

            // validate_flows guarantees the ingress exists
            if let Some(spec) = config.ingress.get(&binding.ingress) {
                if !self.registry.contains(&spec.kind) {
                    return Err(PipelineError::UnsupportedIngressType {
                        index,
                        ingress: binding.ingress.clone(),
                        kind: spec.kind.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate, create the ingestion queues and start one consumer per flow
    ///
    /// Several flows may feed the same ingestion; they share its queue.
    pub async fn start(&self, ctx: &RunContext<ServerConfig>) -> Result<Flows> {
        let config = ctx.config();
        let logger = ctx.logger().clone();
        self.validate(config)?;

        let capacity = config.global.effective_output_queue_size();
        let mut senders: HashMap<&str, MAsyncTx<Record>> = HashMap::new();
        let mut outputs = HashMap::new();
        for name in config.referenced_ingestions() {
            let (tx, rx) = crossfire::mpmc::bounded_async::<Record>(capacity);
            senders.insert(name, tx);
            outputs.insert(name.to_string(), rx);
        }

        let consumer = IngressConsumer::new(Arc::clone(&self.registry));
        let mut running = Vec::with_capacity(config.flow.len());

        for (index, binding) in config.flow.iter().enumerate() {
            let Some(output) = senders.get(binding.ingestion.as_str()) else {
                continue;
            };

            match consumer
                .start(ctx, &binding.ingress, &binding.serialization, output.clone())
                .await
            {
                Ok(handle) => {
                    logger.in_scope(|| {
                        tracing::info!(
                            flow = index,
                            ingress = %binding.ingress,
                            ingestion = %binding.ingestion,
                            serialization = %binding.serialization,
                            "flow started"
                        );
                    });
                    running.push(RunningFlow {
                        index,
                        binding: binding.clone(),
                        handle,
                    });
                }
                Err(source) => {
                    for flow in running {
                        flow.handle.shutdown().await;
                    }
                    return Err(PipelineError::Ingress { index, source });
                }
            }
        }

        logger.in_scope(|| {
            tracing::info!(flows = running.len(), ingestions = outputs.len(), "pipeline started");
        });

        Ok(Flows {
            running,
            outputs,
        })
    }
}

struct RunningFlow {
    index: usize,
    binding: FlowBinding,
    handle: IngressHandle,
}

/// Metrics of one running flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMetrics {
    /// Position of the flow binding
    pub index: usize,
    /// The binding itself
    pub binding: FlowBinding,
    /// Counters of the flow's ingress consumer
    pub ingress: IngressMetricsSnapshot,
}

/// Running flows and the receiving ends of their ingestion queues
pub struct Flows {
    running: Vec<RunningFlow>,
    outputs: HashMap<String, MAsyncRx<Record>>,
}

impl Flows {
    /// Take the receiver of an ingestion queue
    ///
    /// Returns `None` for an ingestion no flow references, or one already
    /// taken.
    pub fn take_output(&mut self, ingestion: &str) -> Option<MAsyncRx<Record>> {
        self.outputs.remove(ingestion)
    }

    /// Ingestions whose receiver has not been taken yet, sorted
    pub fn pending_outputs(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.outputs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of running flows
    pub fn len(&self) -> usize {
        self.running.len()
    }

    /// Whether no flow is running
    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Per-flow counters
    pub fn metrics(&self) -> Vec<FlowMetrics> {
        self.running
            .iter()
            .map(|flow| FlowMetrics {
                index: flow.index,
                binding: flow.binding.clone(),
                ingress: flow.handle.metrics().snapshot(),
            })
            .collect()
    }

    /// Stop every flow and wait for its tasks
    pub async fn shutdown(self) {
        for flow in self.running {
            flow.handle.shutdown().await;
        }
        tracing::info!("pipeline stopped");
    }
}

impl std::fmt::Debug for Flows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flows")
            .field("flows", &self.running.len())
            .field("pending_outputs", &self.pending_outputs())
            .finish()
    }
}
