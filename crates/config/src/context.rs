//! Run context passed to every component entry point
//!
//! Carries the resolved configuration (shared, read-only) and the cancellation
//! token that governs the component's tasks.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::Diagnostics;

/// Configuration types that carry a diagnostics sink
pub trait HasDiagnostics {
    /// The attached sink, defaulted on first access
    fn diagnostics(&self) -> &Diagnostics;
}

/// Explicit execution context: configuration + cancellation
///
/// Cloning is cheap. Clones share the same configuration and token.
pub struct RunContext<C> {
    config: Arc<C>,
    cancel: CancellationToken,
}

impl<C> RunContext<C> {
    /// Create a context with a fresh cancellation token
    pub fn new(config: C) -> Self {
        Self::with_token(Arc::new(config), CancellationToken::new())
    }

    /// Create a context from a shared configuration and an existing token
    pub fn with_token(config: Arc<C>, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Resolved configuration
    pub fn config(&self) -> &Arc<C> {
        &self.config
    }

    /// Token governing this context
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Context whose token is cancelled with this one, but can also be
    /// cancelled on its own
    pub fn child(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            cancel: self.cancel.child_token(),
        }
    }

    /// Cancel this context and all of its children
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether this context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until this context is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

impl<C: HasDiagnostics> RunContext<C> {
    /// Diagnostics sink of the configuration
    pub fn logger(&self) -> &Diagnostics {
        self.config.diagnostics()
    }
}

impl<C> Clone for RunContext<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            cancel: self.cancel.clone(),
        }
    }
}

impl<C> fmt::Debug for RunContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, ServerConfig};

    #[test]
    fn test_context_returns_same_config() {
        let mut config = ServerConfig::default();
        let sink = config.attach_memory_sink();

        let ctx = RunContext::new(config);
        let again = ctx.clone();

        assert!(Arc::ptr_eq(ctx.config(), again.config()));
        assert_eq!(ctx.logger().sink_kind(), "memory");

        ctx.logger().in_scope(|| tracing::info!("through context"));
        assert!(sink.contains("through context"));
    }

    #[test]
    fn test_agent_context_logger() {
        let mut config = Config::default();
        config.attach_memory_sink();
        let ctx = RunContext::new(config);
        assert_eq!(ctx.logger().sink_kind(), "memory");
    }

    #[test]
    fn test_child_cancellation() {
        let ctx = RunContext::new(ServerConfig::default());
        let child = ctx.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!ctx.is_cancelled());

        let other = ctx.child();
        ctx.cancel();
        assert!(other.is_cancelled());
    }
}
