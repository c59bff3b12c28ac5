//! # Ingestion
//!
//! Producer side of the relay: synthesizes readings on a tick and pushes them
//! into the outbound buffer.
//!
//! Responsibilities:
//! - Periodic generation with an adjustable cadence
//! - Drop-on-full when the transport falls behind
//! - Cooperative stop
//!
//! ## Usage Example
//!
//! ```ignore
//! use buffer::BoundedBuffer;
//! use ingestion::ReadingGenerator;
//!
//! let outbound = BoundedBuffer::new("outbound", 100);
//! let generator = ReadingGenerator::new(outbound.clone(), Duration::from_secs(1), observer);
//! let rate = generator.rate_controller();
//!
//! generator.start("Temperature", "A", "1")?;
//! rate.update_frequency(Duration::from_millis(500));
//!
//! generator.stop();
//! generator.join().await;
//! ```

mod error;
mod generator;
mod metrics;
mod rate;
mod simulator;

pub use error::{IngestionError, Result};
pub use generator::{GeneratorState, ReadingGenerator, MAX_TICK, MIN_TICK};
pub use metrics::{GeneratorMetrics, GeneratorSnapshot};
pub use rate::{RateController, FREQUENCY_MAILBOX};
pub use simulator::{UniformSimulator, ValueSimulator};
