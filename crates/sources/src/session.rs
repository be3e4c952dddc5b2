//! Consumer session seam
//!
//! A [`SessionFactory`] is registered per ingress type. The supervising task of
//! an ingress owns the [`ConsumerSession`] it opens and re-opens it whenever the
//! session reports [`SessionError::Closed`].

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::handoff::Handoff;
use crate::settings::IngressSettings;

/// Channel on which a session reports errors it cannot return directly
pub type ErrorSender = mpsc::UnboundedSender<SessionError>;

/// Creates sessions for one ingress type
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Type tag this factory serves (e.g. "kafka")
    fn kind(&self) -> &'static str;

    /// Open a session bound to the settings' topic and group
    ///
    /// Background errors (broker callbacks and the like) go to `errors`.
    async fn open(
        &self,
        settings: &IngressSettings,
        errors: ErrorSender,
    ) -> Result<Box<dyn ConsumerSession>, SessionError>;
}

/// A live subscription
#[async_trait]
pub trait ConsumerSession: Send {
    /// Pull messages and hand them off until cancelled or failed
    ///
    /// Returning `Ok` means the session is still usable (cancellation, or the
    /// group rebalanced); `Err(SessionError::Closed)` asks for a new session.
    async fn consume(&mut self, handoff: &Handoff, cancel: &CancellationToken) -> Result<(), SessionError>;

    /// Leave the group and release resources
    async fn close(&mut self);
}
