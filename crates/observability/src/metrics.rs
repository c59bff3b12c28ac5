//! Relay metrics
//!
//! Component-local counters live next to each component; this module records
//! the cross-cutting ones.

use std::time::Duration;

use contracts::PipelineEvent;
use metrics::{counter, histogram};

/// Count one pipeline event, labelled by kind
pub fn record_event(event: &PipelineEvent) {
    counter!("sensor_relay_events_total", "kind" => event.kind()).increment(1);

    match event {
        PipelineEvent::ReadingDropped { buffer, .. } => {
            counter!("sensor_relay_readings_dropped_total", "buffer" => buffer.clone())
                .increment(1);
        }
        PipelineEvent::PersistFailed { repository, .. } => {
            counter!(
                "sensor_relay_persist_failures_total",
                "repository" => repository.clone()
            )
            .increment(1);
        }
        PipelineEvent::SessionEnded { received, .. } => {
            histogram!("sensor_relay_session_readings").record(*received as f64);
        }
        _ => {}
    }
}

/// Record how a shutdown went
pub fn record_shutdown(outcome: &'static str, elapsed: Duration) {
    counter!("sensor_relay_shutdowns_total", "outcome" => outcome).increment(1);
    histogram!("sensor_relay_shutdown_seconds").record(elapsed.as_secs_f64());
}
