//! Hand-off from a consumer session to the decode workers
//!
//! The session pushes raw payloads into a bounded MPMC queue. Each payload
//! carries its partition position and the callback that commits a position;
//! when that callback runs is decided by the ingress [`AckPolicy`].
//!
//! Commits are cumulative: committing offset `n` of a partition marks every
//! earlier offset of that partition as consumed. Under at-least-once, workers
//! finish messages out of order, so finished offsets go through an
//! [`OffsetTracker`] that only commits the contiguous prefix.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use crossfire::MAsyncTx;
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::metrics::IngressMetrics;
use crate::settings::AckPolicy;

/// Commits a partition position: every offset up to and including the given
/// one is consumed
pub type Commit = Arc<dyn Fn(i32, i64) + Send + Sync>;

/// Position of one message and the way to commit it
#[derive(Clone)]
pub struct Ack {
    partition: i32,
    offset: i64,
    commit: Commit,
}

impl Ack {
    /// Position `offset` in `partition`, committed through `commit`
    pub fn new(partition: i32, offset: i64, commit: Commit) -> Self {
        Self {
            partition,
            offset,
            commit,
        }
    }

    /// Partition of the message
    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Offset of the message
    pub fn offset(&self) -> i64 {
        self.offset
    }

    fn commit_at(&self, offset: i64) {
        (self.commit)(self.partition, offset)
    }
}

impl fmt::Debug for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ack")
            .field("partition", &self.partition)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct PartitionOffsets {
    in_flight: BTreeSet<i64>,
    done: BTreeSet<i64>,
    committed: Option<i64>,
}

/// In-flight offsets per partition
///
/// Offsets are tracked in delivery order and completed in any order.
/// [`complete`](Self::complete) yields a new commit position only when every
/// tracked offset up to it is done.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    partitions: Mutex<HashMap<i32, PartitionOffsets>>,
}

impl OffsetTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an offset handed to the workers
    pub fn track(&self, partition: i32, offset: i64) {
        self.partitions
            .lock()
            .entry(partition)
            .or_default()
            .in_flight
            .insert(offset);
    }

    /// Drop an offset that never reached the workers
    pub fn forget(&self, partition: i32, offset: i64) {
        if let Some(offsets) = self.partitions.lock().get_mut(&partition) {
            offsets.in_flight.remove(&offset);
        }
    }

    /// Mark an offset done, returning the new commit position if it advanced
    pub fn complete(&self, partition: i32, offset: i64) -> Option<i64> {
        let mut partitions = self.partitions.lock();
        let offsets = partitions.get_mut(&partition)?;
        if !offsets.in_flight.remove(&offset) {
            return None;
        }
        offsets.done.insert(offset);

        // highest done offset with nothing in flight below it
        let position = match offsets.in_flight.first() {
            Some(&lowest) => offsets.done.range(..lowest).next_back().copied(),
            None => offsets.done.last().copied(),
        }?;
        offsets.done = offsets.done.split_off(&(position + 1));

        if offsets.committed.is_some_and(|committed| committed >= position) {
            return None;
        }
        offsets.committed = Some(position);
        Some(position)
    }

    /// Number of offsets not yet completed, across partitions
    pub fn in_flight(&self) -> usize {
        self.partitions
            .lock()
            .values()
            .map(|offsets| offsets.in_flight.len())
            .sum()
    }
}

/// One raw message on the decode queue
#[derive(Debug)]
pub struct Delivery {
    /// Message body
    pub payload: Bytes,
    deferred: Option<(Ack, Arc<OffsetTracker>)>,
}

impl Delivery {
    /// Whether the commit waits for [`acknowledge`](Self::acknowledge)
    pub fn is_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Mark the message done, committing the partition if its contiguous
    /// prefix advanced
    ///
    /// A second call does nothing.
    pub fn acknowledge(&mut self) {
        if let Some((ack, tracker)) = self.deferred.take() {
            if let Some(position) = tracker.complete(ack.partition, ack.offset) {
                ack.commit_at(position);
            }
        }
    }
}

/// Sending half of the decode queue, as seen by a session
#[derive(Clone)]
pub struct Handoff {
    queue: MAsyncTx<Delivery>,
    policy: AckPolicy,
    metrics: Arc<IngressMetrics>,
    tracker: Arc<OffsetTracker>,
}

impl Handoff {
    /// Wrap the queue sender
    pub fn new(queue: MAsyncTx<Delivery>, policy: AckPolicy, metrics: Arc<IngressMetrics>) -> Self {
        Self {
            queue,
            policy,
            metrics,
            tracker: Arc::new(OffsetTracker::new()),
        }
    }

    /// Acknowledgement policy in force
    pub fn policy(&self) -> AckPolicy {
        self.policy
    }

    /// Offsets handed to the workers and not yet done
    pub fn tracker(&self) -> &Arc<OffsetTracker> {
        &self.tracker
    }

    /// Push a payload to the workers, waiting for room in the queue
    ///
    /// Must be called in partition order.
    ///
    /// # Errors
    ///
    /// `SessionError::QueueClosed` once every worker is gone.
    pub async fn deliver(&self, payload: Bytes, ack: Ack) -> Result<(), SessionError> {
        let (partition, offset) = (ack.partition, ack.offset);
        let (deferred, immediate) = match self.policy {
            AckPolicy::AtMostOnce => (None, Some(ack)),
            AckPolicy::AtLeastOnce => {
                self.tracker.track(partition, offset);
                (Some((ack, Arc::clone(&self.tracker))), None)
            }
        };

        if self
            .queue
            .send(Delivery { payload, deferred })
            .await
            .is_err()
        {
            self.tracker.forget(partition, offset);
            return Err(SessionError::QueueClosed);
        }
        self.metrics.message_received();

        if let Some(ack) = immediate {
            ack.commit_at(offset);
        }
        Ok(())
    }
}

impl fmt::Debug for Handoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handoff")
            .field("policy", &self.policy)
            .field("in_flight", &self.tracker.in_flight())
            .finish_non_exhaustive()
    }
}
