//! Transport metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Counters for the transport client
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// Readings written to an open stream
    sent: AtomicU64,
    /// Sends that failed (reading lost)
    send_failures: AtomicU64,
    /// Failed dial attempts
    dial_failures: AtomicU64,
    /// Failed stream opens
    open_failures: AtomicU64,
    /// Streams successfully opened
    connects: AtomicU64,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        counter!("sensor_relay_readings_sent_total").increment(1);
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dial_failures(&self) -> u64 {
        self.dial_failures.load(Ordering::Relaxed)
    }

    pub fn record_dial_failure(&self) {
        self.dial_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn open_failures(&self) -> u64 {
        self.open_failures.load(Ordering::Relaxed)
    }

    pub fn record_open_failure(&self) {
        self.open_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            sent: self.sent(),
            send_failures: self.send_failures(),
            dial_failures: self.dial_failures(),
            open_failures: self.open_failures(),
            connects: self.connects(),
        }
    }
}

/// Snapshot of client counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub sent: u64,
    pub send_failures: u64,
    pub dial_failures: u64,
    pub open_failures: u64,
    pub connects: u64,
}

/// Counters for the ingress server
#[derive(Debug, Default)]
pub struct IngressMetrics {
    sessions_opened: AtomicU64,
    sessions_ended: AtomicU64,
    sessions_failed: AtomicU64,
    /// Readings decoded from all sessions
    received: AtomicU64,
    /// Readings discarded on a full inbound buffer
    dropped: AtomicU64,
}

impl IngressMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened.load(Ordering::Relaxed)
    }

    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sessions_ended(&self) -> u64 {
        self.sessions_ended.load(Ordering::Relaxed)
    }

    pub fn record_session_ended(&self) {
        self.sessions_ended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sessions_failed(&self) -> u64 {
        self.sessions_failed.load(Ordering::Relaxed)
    }

    pub fn record_session_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        counter!("sensor_relay_readings_received_total").increment(1);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> IngressSnapshot {
        IngressSnapshot {
            sessions_opened: self.sessions_opened(),
            sessions_ended: self.sessions_ended(),
            sessions_failed: self.sessions_failed(),
            received: self.received(),
            dropped: self.dropped(),
        }
    }
}

/// Snapshot of ingress counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngressSnapshot {
    pub sessions_opened: u64,
    pub sessions_ended: u64,
    pub sessions_failed: u64,
    pub received: u64,
    pub dropped: u64,
}
