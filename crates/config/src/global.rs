//! Global server settings
//!
//! Settings that apply across all flows.

use serde::{Deserialize, Serialize};

/// Default capacity of each ingestion output queue
pub const DEFAULT_OUTPUT_QUEUE_SIZE: usize = 1000;

/// Global configuration that applies to all flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Capacity of the queue between flows and each ingestion
    /// Default: 1000
    pub output_queue_size: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_queue_size: DEFAULT_OUTPUT_QUEUE_SIZE,
        }
    }
}

impl GlobalConfig {
    /// Effective output queue size (never zero)
    pub fn effective_output_queue_size(&self) -> usize {
        self.output_queue_size.max(1)
    }
}
