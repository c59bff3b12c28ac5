//! # Buffer
//!
//! Bounded producer/consumer queue shared by every stage of the relay.
//!
//! Used three ways:
//! - outbound: generator → transport client
//! - inbound: ingress sessions → persistence workers
//! - capacity-1 mailbox: control surface → generator
//!
//! ```ignore
//! use buffer::{BoundedBuffer, Offer};
//!
//! let buffer = BoundedBuffer::new("outbound", 100);
//! if buffer.offer(reading) == Offer::Dropped {
//!     // report and move on
//! }
//! while let Some(reading) = buffer.take().await {
//!     // ...
//! }
//! ```

mod bounded;
mod error;
mod metrics;

pub use bounded::{BoundedBuffer, Offer};
pub use error::BufferError;
pub use metrics::{BufferMetrics, BufferSnapshot};
