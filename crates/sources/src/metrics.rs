//! Ingress metrics
//!
//! Lock-free counters shared by the supervising, error-drain and worker tasks
//! of one ingress.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of one ingress consumer
#[derive(Debug, Default)]
pub struct IngressMetrics {
    /// Messages handed to the decode queue
    pub received: AtomicU64,

    /// Payloads decoded into records
    pub decoded: AtomicU64,

    /// Payloads dropped as undecodable
    pub decode_failed: AtomicU64,

    /// Records placed on the output queue
    pub forwarded: AtomicU64,

    /// Session-level errors drained
    pub session_errors: AtomicU64,

    /// Sessions re-created after the first
    pub restarts: AtomicU64,
}

impl IngressMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            decoded: AtomicU64::new(0),
            decode_failed: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            session_errors: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
        }
    }

    /// Record a message handed off
    #[inline]
    pub fn message_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decoded payload
    #[inline]
    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped payload
    #[inline]
    pub fn decode_failed(&self) {
        self.decode_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a forwarded record
    #[inline]
    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session error
    #[inline]
    pub fn session_error(&self) {
        self.session_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session re-creation
    #[inline]
    pub fn session_restarted(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> IngressMetricsSnapshot {
        IngressMetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            decode_failed: self.decode_failed.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            session_errors: self.session_errors.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of ingress metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngressMetricsSnapshot {
    pub received: u64,
    pub decoded: u64,
    pub decode_failed: u64,
    pub forwarded: u64,
    pub session_errors: u64,
    pub restarts: u64,
}
