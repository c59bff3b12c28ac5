//! ShutdownCoordinator - ordered, time-bounded teardown
//!
//! Order:
//! 1. stop the generator
//! 2. close the outbound buffer and let the client drain and end its stream
//! 3. cancel the ingress, forcing open sessions closed
//! 4. stop the worker pool (drains the inbound buffer)
//!
//! The whole sequence runs under one timeout. When it expires, whatever is
//! still running is aborted and the outcome is `Forced`.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::producer::ProducerPipeline;
use crate::receiver::ReceiverPipeline;

/// Default bound on the whole sequence
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How a shutdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every step completed within the timeout
    Graceful,
    /// The timeout expired; remaining work was abandoned
    Forced,
}

impl ShutdownOutcome {
    pub fn is_graceful(self) -> bool {
        self == Self::Graceful
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graceful => "graceful",
            Self::Forced => "forced",
        }
    }
}

/// Tears down whichever pipeline halves run in this process
pub struct ShutdownCoordinator<'a> {
    producer: Option<&'a ProducerPipeline>,
    receiver: Option<&'a ReceiverPipeline>,
    timeout: Duration,
}

impl<'a> ShutdownCoordinator<'a> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            producer: None,
            receiver: None,
            timeout,
        }
    }

    pub fn with_producer(mut self, producer: &'a ProducerPipeline) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn with_receiver(mut self, receiver: &'a ReceiverPipeline) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Run the teardown sequence
    #[instrument(name = "shutdown", skip(self), fields(timeout_ms = self.timeout.as_millis() as u64))]
    pub async fn shutdown(self) -> ShutdownOutcome {
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, self.sequence()).await {
            Ok(()) => ShutdownOutcome::Graceful,
            Err(_) => {
                warn!("shutdown timed out, abandoning remaining work");
                if let Some(producer) = self.producer {
                    producer.abort().await;
                }
                if let Some(receiver) = self.receiver {
                    receiver.abort().await;
                }
                ShutdownOutcome::Forced
            }
        };

        let elapsed = started.elapsed();
        observability::record_shutdown(outcome.as_str(), elapsed);
        info!(
            outcome = outcome.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "shutdown complete"
        );
        outcome
    }

    async fn sequence(&self) {
        if let Some(producer) = self.producer {
            producer.stop_generator().await;
            info!("generator stopped");
            producer.stop_client().await;
            info!("transport client stopped");
        }
        if let Some(receiver) = self.receiver {
            receiver.stop_ingress().await;
            info!("ingress stopped");
            receiver.stop_pool().await;
            info!("worker pool stopped");
        }
    }
}
