//! # Pipeline
//!
//! Assembles the relay halves and tears them down in order.
//!
//! - `ProducerPipeline`: generator, outbound buffer, transport client
//! - `ReceiverPipeline`: ingress, inbound buffer, worker pool
//! - `ShutdownCoordinator`: time-bounded, ordered teardown
//!
//! ## Usage Example
//!
//! ```ignore
//! let receiver = ReceiverPipeline::start(&config.receiver, repository, observer.clone()).await?;
//! let producer = ProducerPipeline::start(&config.producer, observer)?;
//!
//! tokio::signal::ctrl_c().await?;
//! let outcome = ShutdownCoordinator::new(config.shutdown.timeout())
//!     .with_producer(&producer)
//!     .with_receiver(&receiver)
//!     .shutdown()
//!     .await;
//! ```

mod error;
mod producer;
mod receiver;
mod shutdown;
mod stats;

pub use error::{PipelineError, Result};
pub use producer::{ProducerPipeline, OUTBOUND_BUFFER};
pub use receiver::{ReceiverPipeline, INBOUND_BUFFER};
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome, DEFAULT_SHUTDOWN_TIMEOUT};
pub use stats::{PipelineStats, ProducerStats, ReceiverStats};
