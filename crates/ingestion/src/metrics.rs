//! Generator metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Counters for one generator
#[derive(Debug, Default)]
pub struct GeneratorMetrics {
    /// Readings created
    produced: AtomicU64,
    /// Readings discarded on a full outbound buffer
    dropped: AtomicU64,
    /// Frequency commands applied
    frequency_changes: AtomicU64,
}

impl GeneratorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    pub fn record_produced(&self) {
        self.produced.fetch_add(1, Ordering::Relaxed);
        counter!("sensor_relay_readings_produced_total").increment(1);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frequency_changes(&self) -> u64 {
        self.frequency_changes.load(Ordering::Relaxed)
    }

    pub fn record_frequency_change(&self) {
        self.frequency_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> GeneratorSnapshot {
        GeneratorSnapshot {
            produced: self.produced(),
            dropped: self.dropped(),
            frequency_changes: self.frequency_changes(),
        }
    }
}

/// Snapshot of generator counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorSnapshot {
    pub produced: u64,
    pub dropped: u64,
    pub frequency_changes: u64,
}
