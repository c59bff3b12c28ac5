//! TracingObserver - production `PipelineObserver`

use contracts::{PipelineEvent, PipelineObserver};
use tracing::{debug, error, info, warn};

use crate::metrics::record_event;

/// Logs every event at its level and counts it
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        record_event(event);

        match event {
            PipelineEvent::ReadingDropped { buffer, capacity } => {
                warn!(%buffer, capacity, "buffer full, reading dropped")
            }
            PipelineEvent::FrequencyChanged { interval } => {
                info!(interval_ms = interval.as_millis() as u64, "frequency changed")
            }
            PipelineEvent::FrequencyUpdateSkipped { requested } => warn!(
                requested_ms = requested.as_millis() as u64,
                "frequency update skipped, previous update still pending"
            ),
            PipelineEvent::DialFailed { addr, error } => {
                warn!(%addr, %error, "failed to connect to receiver, retrying")
            }
            PipelineEvent::StreamOpenFailed { addr, error } => {
                warn!(%addr, %error, "failed to open stream, retrying")
            }
            PipelineEvent::SendFailed { addr, error } => {
                warn!(%addr, %error, "send failed, reconnecting")
            }
            PipelineEvent::StreamFinished { addr, ok, message } => {
                info!(%addr, ok, %message, "stream closed by receiver")
            }
            PipelineEvent::SessionOpened { peer } => debug!(%peer, "session opened"),
            PipelineEvent::SessionEnded { peer, received } => {
                info!(%peer, received, "session ended")
            }
            PipelineEvent::SessionFailed { peer, error } => {
                warn!(%peer, %error, "session terminated")
            }
            PipelineEvent::PersistFailed { repository, error } => {
                error!(%repository, %error, "failed to save reading")
            }
        }
    }
}
