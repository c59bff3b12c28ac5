//! Pipeline statistics, reported at shutdown

use std::fmt;
use std::time::Duration;

use buffer::BufferSnapshot;
use ingestion::GeneratorSnapshot;
use persistence::PoolSnapshot;
use transport::{ClientSnapshot, IngressSnapshot};

use crate::shutdown::ShutdownOutcome;

/// Producer-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub generator: GeneratorSnapshot,
    pub outbound: BufferSnapshot,
    pub client: ClientSnapshot,
}

/// Receiver-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub ingress: IngressSnapshot,
    pub inbound: BufferSnapshot,
    pub pool: PoolSnapshot,
}

/// Statistics from one process run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub producer: Option<ProducerStats>,
    pub receiver: Option<ReceiverStats>,
    /// Total run time including shutdown
    pub duration: Duration,
    pub outcome: ShutdownOutcome,
}

impl PipelineStats {
    /// Readings generated per second
    pub fn production_rate(&self) -> f64 {
        match self.producer {
            Some(p) if self.duration.as_secs_f64() > 0.0 => {
                p.generator.produced as f64 / self.duration.as_secs_f64()
            }
            _ => 0.0,
        }
    }

    /// Share of generated readings dropped on a full outbound buffer (percent)
    pub fn outbound_drop_rate(&self) -> f64 {
        match self.producer {
            Some(p) if p.generator.produced > 0 => {
                p.generator.dropped as f64 / p.generator.produced as f64 * 100.0
            }
            _ => 0.0,
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n{self}");
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Relay Statistics ===")?;
        writeln!(f, "Duration: {:.2}s", self.duration.as_secs_f64())?;
        writeln!(f, "Shutdown: {}", self.outcome.as_str())?;

        if let Some(p) = &self.producer {
            writeln!(f, "Producer")?;
            writeln!(
                f,
                "  ├─ Generated: {} ({:.2}/s)",
                p.generator.produced,
                self.production_rate()
            )?;
            writeln!(
                f,
                "  ├─ Dropped (outbound full): {} ({:.2}%)",
                p.generator.dropped,
                self.outbound_drop_rate()
            )?;
            writeln!(f, "  ├─ Frequency changes: {}", p.generator.frequency_changes)?;
            writeln!(f, "  ├─ Sent: {}", p.client.sent)?;
            writeln!(f, "  ├─ Send failures: {}", p.client.send_failures)?;
            writeln!(
                f,
                "  └─ Connects: {} (dial failures: {})",
                p.client.connects, p.client.dial_failures
            )?;
        }

        if let Some(r) = &self.receiver {
            writeln!(f, "Receiver")?;
            writeln!(
                f,
                "  ├─ Sessions: {} (ended: {}, failed: {})",
                r.ingress.sessions_opened, r.ingress.sessions_ended, r.ingress.sessions_failed
            )?;
            writeln!(f, "  ├─ Received: {}", r.ingress.received)?;
            writeln!(f, "  ├─ Dropped (inbound full): {}", r.ingress.dropped)?;
            writeln!(f, "  ├─ Saved: {}", r.pool.saved)?;
            writeln!(f, "  └─ Save failures: {}", r.pool.failed)?;
        }

        Ok(())
    }
}
