//! Worker pool metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use metrics::{counter, gauge};

/// Counters shared by all workers of a pool
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Readings taken but not yet saved
    in_flight: AtomicUsize,
    /// Successful saves
    saved: AtomicU64,
    /// Failed saves
    failed: AtomicU64,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn begin(&self) {
        let n = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!("sensor_relay_pool_in_flight").set(n as f64);
    }

    pub fn end(&self) {
        let n = self.in_flight.fetch_sub(1, Ordering::Relaxed) - 1;
        gauge!("sensor_relay_pool_in_flight").set(n as f64);
    }

    pub fn saved(&self) -> u64 {
        self.saved.load(Ordering::Relaxed)
    }

    pub fn record_saved(&self) {
        self.saved.fetch_add(1, Ordering::Relaxed);
        counter!("sensor_relay_readings_saved_total").increment(1);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            in_flight: self.in_flight(),
            saved: self.saved(),
            failed: self.failed(),
        }
    }
}

/// Snapshot of pool counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub in_flight: usize,
    pub saved: u64,
    pub failed: u64,
}
