//! PipelineObserver - injectable sink for countable pipeline events
//!
//! Drops, transport failures and persistence failures are reported here rather
//! than written straight to a global logger, so callers decide what to do with
//! them (log + metrics in production, record in tests).

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Events emitted by pipeline components
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A buffer was full and the newest item was discarded
    ReadingDropped { buffer: String, capacity: usize },

    /// The generator switched to a new tick interval
    FrequencyChanged { interval: Duration },

    /// A frequency command arrived while another was still pending
    FrequencyUpdateSkipped { requested: Duration },

    /// Dialing the receiver failed
    DialFailed { addr: String, error: String },

    /// The connection came up but the stream could not be opened
    StreamOpenFailed { addr: String, error: String },

    /// Sending a reading failed; the reading is lost
    SendFailed { addr: String, error: String },

    /// A stream was ended cleanly and acknowledged
    StreamFinished { addr: String, ok: bool, message: String },

    /// The ingress accepted a new session
    SessionOpened { peer: String },

    /// A session ended with a clean end of stream
    SessionEnded { peer: String, received: u64 },

    /// A session terminated with a receive error
    SessionFailed { peer: String, error: String },

    /// A `save` call failed
    PersistFailed { repository: String, error: String },
}

impl PipelineEvent {
    /// Short stable name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReadingDropped { .. } => "reading_dropped",
            Self::FrequencyChanged { .. } => "frequency_changed",
            Self::FrequencyUpdateSkipped { .. } => "frequency_update_skipped",
            Self::DialFailed { .. } => "dial_failed",
            Self::StreamOpenFailed { .. } => "stream_open_failed",
            Self::SendFailed { .. } => "send_failed",
            Self::StreamFinished { .. } => "stream_finished",
            Self::SessionOpened { .. } => "session_opened",
            Self::SessionEnded { .. } => "session_ended",
            Self::SessionFailed { .. } => "session_failed",
            Self::PersistFailed { .. } => "persist_failed",
        }
    }
}

/// Receiver of pipeline events
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Shared observer handle passed to every component
pub type SharedObserver = Arc<dyn PipelineObserver>;

impl<F> PipelineObserver for F
where
    F: Fn(&PipelineEvent) + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent) {
        self(event)
    }
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Observer that keeps every event in memory
///
/// Used by tests to assert on drops and failures deterministically.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events seen so far
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.lock().clone()
    }

    /// Number of events of the given kind
    pub fn count(&self, kind: &str) -> usize {
        self.lock().iter().filter(|e| e.kind() == kind).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PipelineEvent>> {
        // A panicking test thread must not hide the events from the rest of the test
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.lock().push(event.clone());
    }
}
