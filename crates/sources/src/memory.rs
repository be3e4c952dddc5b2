//! In-memory ingress
//!
//! A broker that lives in the process: publish payloads, script session
//! failures, and observe which offsets were marked. Used to embed tcptrail
//! without Kafka and to drive the consumer in tests.
//!
//! ```ignore
//! let broker = MemoryBroker::new();
//! let mut registry = IngressRegistry::new();
//! registry.register(broker.factory());
//! broker.publish(br#"{"SAddr":"10.0.0.1"}"#.as_slice());
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use crossfire::{MAsyncRx, MAsyncTx};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::handoff::{Ack, Commit, Handoff};
use crate::session::{ConsumerSession, ErrorSender, SessionFactory};
use crate::settings::IngressSettings;

/// Type tag of the in-memory ingress
pub const MEMORY_KIND: &str = "memory";

const BROKER_CAPACITY: usize = 4096;

/// The broker has a single partition
const MEMORY_PARTITION: i32 = 0;

/// Scripted session behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryFault {
    /// `consume` fails with a transport error
    Transport(String),
    /// `consume` reports the session closed
    Closed,
    /// `consume` returns `Ok` without reading (group rebalance)
    Rebalance,
}

#[derive(Default)]
struct BrokerState {
    faults: Mutex<VecDeque<MemoryFault>>,
    failed_opens: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
    next_offset: AtomicU64,
    acked: Mutex<Vec<u64>>,
}

struct Message {
    offset: u64,
    payload: Bytes,
}

/// Process-local message broker
#[derive(Clone)]
pub struct MemoryBroker {
    tx: MAsyncTx<Message>,
    rx: MAsyncRx<Message>,
    state: Arc<BrokerState>,
}

impl MemoryBroker {
    /// Create an empty broker
    pub fn new() -> Self {
        let (tx, rx) = crossfire::mpmc::bounded_async(BROKER_CAPACITY);
        Self {
            tx,
            rx,
            state: Arc::new(BrokerState::default()),
        }
    }

    /// Session factory reading from this broker
    pub fn factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(MemorySessionFactory {
            broker: self.clone(),
        })
    }

    /// Append a message, returning its offset
    ///
    /// Messages beyond the broker capacity are dropped and `None` is returned.
    pub fn publish(&self, payload: impl Into<Bytes>) -> Option<u64> {
        let offset = self.state.next_offset.fetch_add(1, Ordering::Relaxed);
        let message = Message {
            offset,
            payload: payload.into(),
        };
        self.tx.try_send(message).ok().map(|()| offset)
    }

    /// Queue a fault for the next `consume` call
    pub fn inject(&self, fault: MemoryFault) {
        self.state.faults.lock().push_back(fault);
    }

    /// Make the next `count` calls to `open` fail
    pub fn fail_opens(&self, count: usize) {
        self.state.failed_opens.store(count, Ordering::Relaxed);
    }

    /// Commit positions, in commit order
    ///
    /// Each entry marks every offset up to and including it as consumed.
    pub fn acked(&self) -> Vec<u64> {
        self.state.acked.lock().clone()
    }

    /// Successful `open` calls
    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::Relaxed)
    }

    /// `close` calls
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::Relaxed)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

struct MemorySessionFactory {
    broker: MemoryBroker,
}

#[async_trait]
impl SessionFactory for MemorySessionFactory {
    fn kind(&self) -> &'static str {
        MEMORY_KIND
    }

    async fn open(
        &self,
        settings: &IngressSettings,
        _errors: ErrorSender,
    ) -> Result<Box<dyn ConsumerSession>, SessionError> {
        let state = &self.broker.state;
        let pending = state.failed_opens.load(Ordering::Relaxed);
        if pending > 0 {
            state.failed_opens.store(pending - 1, Ordering::Relaxed);
            return Err(SessionError::setup(format!(
                "memory broker refused group '{}'",
                settings.group_id
            )));
        }

        state.opens.fetch_add(1, Ordering::Relaxed);
        let broker_state = Arc::clone(state);
        let commit: Commit = Arc::new(move |_, offset| broker_state.acked.lock().push(offset as u64));
        Ok(Box::new(MemorySession {
            broker: self.broker.clone(),
            commit,
        }))
    }
}

struct MemorySession {
    broker: MemoryBroker,
    commit: Commit,
}

#[async_trait]
impl ConsumerSession for MemorySession {
    async fn consume(&mut self, handoff: &Handoff, cancel: &CancellationToken) -> Result<(), SessionError> {
        let fault = self.broker.state.faults.lock().pop_front();
        match fault {
            Some(MemoryFault::Transport(message)) => return Err(SessionError::transport(message)),
            Some(MemoryFault::Closed) => return Err(SessionError::Closed),
            Some(MemoryFault::Rebalance) => return Ok(()),
            None => {}
        }

        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                message = self.broker.rx.recv() => message.map_err(|_| SessionError::Closed)?,
            };

            let ack = Ack::new(MEMORY_PARTITION, message.offset as i64, Arc::clone(&self.commit));

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                delivered = handoff.deliver(message.payload, ack) => delivered?,
            }
        }
    }

    async fn close(&mut self) {
        self.broker.state.closes.fetch_add(1, Ordering::Relaxed);
    }
}
