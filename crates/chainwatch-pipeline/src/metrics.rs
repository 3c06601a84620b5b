//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters shared by the dispatcher and the workers.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    received: AtomicU64,
    admitted: AtomicU64,
    dropped: AtomicU64,
    missed: AtomicU64,
    filtered: AtomicU64,
    reported: AtomicU64,
    derive_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Identifiers read from the feed
    pub received: u64,
    /// Identifiers accepted into the queue
    pub admitted: u64,
    /// Identifiers dropped because the queue was full
    pub dropped: u64,
    /// Lookups that returned `NotAvailable`
    pub missed: u64,
    /// Records at or below the threshold
    pub filtered: u64,
    /// Reports emitted
    pub reported: u64,
    /// Records above the threshold whose sender could not be derived
    pub derive_failures: u64,
}

impl MetricsSnapshot {
    /// Identifiers that have left the pipeline one way or another.
    pub fn processed(&self) -> u64 {
        self.missed + self.filtered + self.reported + self.derive_failures
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_missed(&self) {
        self.missed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reported(&self) {
        self.reported.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_derive_failure(&self) {
        self.derive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            missed: self.missed.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            reported: self.reported.load(Ordering::Relaxed),
            derive_failures: self.derive_failures.load(Ordering::Relaxed),
        }
    }
}
