//! Buffer metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single buffer
#[derive(Debug, Default)]
pub struct BufferMetrics {
    /// Items enqueued
    accepted: AtomicU64,
    /// Items discarded because the buffer was full
    dropped: AtomicU64,
    /// Items handed to a consumer
    taken: AtomicU64,
}

impl BufferMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn taken(&self) -> u64 {
        self.taken.load(Ordering::Relaxed)
    }

    pub fn record_taken(&self) {
        self.taken.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            accepted: self.accepted(),
            dropped: self.dropped(),
            taken: self.taken(),
        }
    }
}

/// Snapshot of buffer counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub accepted: u64,
    pub dropped: u64,
    pub taken: u64,
}
