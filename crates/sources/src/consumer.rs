//! Ingress consumer
//!
//! One consumer per flow binding. Starting it opens the first session, then
//! spawns three kinds of tasks under a child cancellation token:
//!
//! - **Supervisor**: owns the session and runs the reconnect state machine
//! - **Error drain**: logs session errors as they arrive
//! - **Workers**: decode payloads from the shared queue and forward records
//!
//! ```text
//!   session ──► decode queue (mpmc, queue_size) ──► worker × N ──► output
//!      │
//!      └──► error channel ──► error drain ──► diagnostics
//! ```

use std::sync::Arc;

use crossfire::{MAsyncRx, MAsyncTx};
use tcptrail_config::{RunContext, ServerConfig};
use tcptrail_protocol::{Decoder, Record, SerializationRegistry};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::error::{IngressError, SessionError};
use crate::handoff::{Delivery, Handoff};
use crate::metrics::IngressMetrics;
use crate::registry::IngressRegistry;
use crate::session::{ConsumerSession, ErrorSender, SessionFactory};
use crate::settings::IngressSettings;

/// Starts ingress consumers from the server configuration
#[derive(Debug, Clone)]
pub struct IngressConsumer {
    registry: Arc<IngressRegistry>,
}

impl IngressConsumer {
    /// Create a consumer launcher over a factory registry
    pub fn new(registry: Arc<IngressRegistry>) -> Self {
        Self { registry }
    }

    /// Start consuming `ingress`, decoding with `serialization` into `output`
    ///
    /// Returns once the first session is open and every task is spawned.
    ///
    /// # Errors
    ///
    /// Fails if the ingress is undeclared, its type has no factory, its
    /// settings are malformed, the format is unknown, or the first session
    /// cannot be opened. Nothing keeps running after an error.
    pub async fn start(
        &self,
        ctx: &RunContext<ServerConfig>,
        ingress: &str,
        serialization: &str,
        output: MAsyncTx<Record>,
    ) -> Result<IngressHandle, IngressError> {
        let decoder = SerializationRegistry::resolve(serialization)?;

        let spec = ctx
            .config()
            .ingress
            .get(ingress)
            .ok_or_else(|| IngressError::UnknownIngress(ingress.to_string()))?;
        let settings = Arc::new(IngressSettings::from_spec(spec)?);
        let factory = self
            .registry
            .get(&spec.kind)
            .ok_or_else(|| IngressError::unsupported(ingress, &spec.kind))?;

        let diagnostics = ctx.logger().clone();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let session = diagnostics
            .attach(factory.open(&settings, errors_tx.clone()))
            .await
            .map_err(|source| IngressError::Open {
                name: ingress.to_string(),
                source,
            })?;

        let name: Arc<str> = Arc::from(ingress);
        let cancel = ctx.cancel_token().child_token();
        let metrics = Arc::new(IngressMetrics::new());
        let (queue_tx, queue_rx) = crossfire::mpmc::bounded_async::<Delivery>(settings.queue_size);
        let handoff = Handoff::new(queue_tx, settings.ack, Arc::clone(&metrics));

        let mut tasks = Vec::with_capacity(settings.workers + 2);

        tasks.push(tokio::spawn(diagnostics.attach(drain_errors(
            Arc::clone(&name),
            errors_rx,
            Arc::clone(&metrics),
            cancel.clone(),
        ))));

        let supervisor = Supervisor {
            name: Arc::clone(&name),
            factory,
            settings: Arc::clone(&settings),
            errors: errors_tx,
            handoff,
            metrics: Arc::clone(&metrics),
            cancel: cancel.clone(),
        };
        tasks.push(tokio::spawn(diagnostics.attach(supervisor.run(session))));

        for id in 0..settings.workers {
            let worker = Worker {
                id,
                name: Arc::clone(&name),
                decoder,
                queue: queue_rx.clone(),
                output: output.clone(),
                metrics: Arc::clone(&metrics),
                cancel: cancel.clone(),
            };
            tasks.push(tokio::spawn(diagnostics.attach(worker.run())));
        }

        diagnostics.in_scope(|| {
            tracing::info!(
                ingress = %name,
                kind = %spec.kind,
                format = %decoder.format(),
                workers = settings.workers,
                queue_size = settings.queue_size,
                ack = ?settings.ack,
                "ingress started"
            );
        });

        Ok(IngressHandle {
            name,
            cancel,
            tasks,
            metrics,
        })
    }
}

/// Running ingress consumer
#[derive(Debug)]
pub struct IngressHandle {
    name: Arc<str>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    metrics: Arc<IngressMetrics>,
}

impl IngressHandle {
    /// Ingress name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared counters
    pub fn metrics(&self) -> &Arc<IngressMetrics> {
        &self.metrics
    }

    /// Token governing every task of this consumer
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop every task and wait for them
    ///
    /// The supervisor closes the session on its way out. Messages still in the
    /// decode queue are dropped.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(ingress = %self.name, error = %e, "ingress task panicked");
            }
        }
    }
}

async fn drain_errors(
    name: Arc<str>,
    mut errors: mpsc::UnboundedReceiver<SessionError>,
    metrics: Arc<IngressMetrics>,
    cancel: CancellationToken,
) {
    loop {
        let error = tokio::select! {
            _ = cancel.cancelled() => break,
            error = errors.recv() => match error {
                Some(error) => error,
                None => break,
            },
        };
        metrics.session_error();
        tracing::error!(ingress = %name, error = %error, "ingress session error");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Connecting,
    Consuming,
    Backoff,
    Stopped,
}

struct Supervisor {
    name: Arc<str>,
    factory: Arc<dyn SessionFactory>,
    settings: Arc<IngressSettings>,
    errors: ErrorSender,
    handoff: Handoff,
    metrics: Arc<IngressMetrics>,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run(self, session: Box<dyn ConsumerSession>) {
        let mut session = Some(session);
        let mut backoff = Backoff::new(&self.settings.backoff);
        let mut state = State::Consuming;

        loop {
            if self.cancel.is_cancelled() {
                state = State::Stopped;
            }

            state = match state {
                State::Connecting => {
                    let opened = tokio::select! {
                        _ = self.cancel.cancelled() => None,
                        opened = self.factory.open(&self.settings, self.errors.clone()) => Some(opened),
                    };
                    match opened {
                        None => State::Stopped,
                        Some(Ok(fresh)) => {
                            session = Some(fresh);
                            self.metrics.session_restarted();
                            tracing::info!(ingress = %self.name, "ingress session re-created");
                            State::Consuming
                        }
                        Some(Err(e)) => {
                            self.report(e);
                            State::Backoff
                        }
                    }
                }
                State::Consuming => match session.as_mut() {
                    None => State::Connecting,
                    Some(active) => match active.consume(&self.handoff, &self.cancel).await {
                        Ok(()) => {
                            backoff.reset();
                            State::Consuming
                        }
                        Err(SessionError::Closed) => {
                            if let Some(mut closed) = session.take() {
                                closed.close().await;
                            }
                            tracing::warn!(ingress = %self.name, "ingress session closed, reconnecting");
                            State::Connecting
                        }
                        Err(SessionError::QueueClosed) => State::Stopped,
                        Err(e) => {
                            self.report(e);
                            State::Backoff
                        }
                    },
                },
                State::Backoff => {
                    let delay = backoff.next_delay();
                    tracing::debug!(
                        ingress = %self.name,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "ingress backing off"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => State::Stopped,
                        _ = tokio::time::sleep(delay) => {
                            if session.is_some() { State::Consuming } else { State::Connecting }
                        }
                    }
                }
                State::Stopped => break,
            };
        }

        if let Some(mut active) = session.take() {
            active.close().await;
        }
        tracing::info!(ingress = %self.name, "ingress stopped");
    }

    fn report(&self, error: SessionError) {
        // the drain task logs and counts
        if let Err(mpsc::error::SendError(error)) = self.errors.send(error) {
            tracing::error!(ingress = %self.name, error = %error, "ingress session error");
        }
    }
}

struct Worker {
    id: usize,
    name: Arc<str>,
    decoder: Decoder,
    queue: MAsyncRx<Delivery>,
    output: MAsyncTx<Record>,
    metrics: Arc<IngressMetrics>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        loop {
            let mut delivery = tokio::select! {
                _ = self.cancel.cancelled() => break,
                delivery = self.queue.recv() => match delivery {
                    Ok(delivery) => delivery,
                    Err(_) => break,
                },
            };

            match self.decoder.decode(&delivery.payload) {
                Ok(record) => {
                    self.metrics.record_decoded();
                    let sent = tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        sent = self.output.send(record) => sent,
                    };
                    if sent.is_err() {
                        tracing::warn!(ingress = %self.name, worker = self.id, "output queue closed");
                        break;
                    }
                    self.metrics.record_forwarded();
                }
                Err(e) => {
                    self.metrics.decode_failed();
                    tracing::warn!(
                        ingress = %self.name,
                        worker = self.id,
                        format = %self.decoder.format(),
                        bytes = delivery.payload.len(),
                        error = %e,
                        "dropping undecodable message"
                    );
                }
            }

            delivery.acknowledge();
        }
    }
}
