//! Rate controller
//!
//! Hands a new tick interval to the running generator through a capacity-1
//! mailbox. While a command is pending, further commands are skipped: the
//! first unconsumed command wins until the generator reads it.

use std::time::Duration;

use buffer::{BoundedBuffer, Offer};
use contracts::{PipelineEvent, SharedObserver};
use tracing::debug;

/// Name of the frequency mailbox buffer
pub const FREQUENCY_MAILBOX: &str = "frequency";

/// Fire-and-forget handle for changing the generator cadence
#[derive(Clone)]
pub struct RateController {
    mailbox: BoundedBuffer<Duration>,
    observer: SharedObserver,
}

impl RateController {
    pub(crate) fn new(mailbox: BoundedBuffer<Duration>, observer: SharedObserver) -> Self {
        Self { mailbox, observer }
    }

    /// Request a new inter-reading interval
    ///
    /// Never blocks. Zero is accepted; the generator clamps it to its
    /// minimum period.
    pub fn update_frequency(&self, interval: Duration) -> Offer {
        let outcome = self.mailbox.offer(interval);
        match outcome {
            Offer::Accepted => {
                debug!(interval_ms = interval.as_millis() as u64, "frequency update queued");
            }
            Offer::Dropped | Offer::Closed => {
                self.observer
                    .on_event(&PipelineEvent::FrequencyUpdateSkipped { requested: interval });
            }
        }
        outcome
    }

    /// Whether a command is waiting to be consumed
    pub fn has_pending(&self) -> bool {
        !self.mailbox.is_empty()
    }
}
