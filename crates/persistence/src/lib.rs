//! # Persistence
//!
//! Receiver side fan-out: a fixed pool of workers drains the inbound buffer
//! and calls `save` on a shared repository.
//!
//! Features:
//! - N concurrent workers, failures reported and skipped
//! - Idempotent `stop()` that waits for a full drain
//! - Memory, JSON-lines file and log repositories
//!
//! ## Usage Example
//!
//! ```ignore
//! use persistence::{Repository, WorkerPool};
//!
//! let repository = Arc::new(Repository::from_config(&config.receiver.storage).await?);
//! let pool = WorkerPool::start(repository, 10, inbound.clone(), observer)?;
//! // ...
//! pool.stop().await;
//! ```

mod error;
mod metrics;
mod pool;
mod repositories;

pub use error::{PersistenceError, Result};
pub use metrics::{PoolMetrics, PoolSnapshot};
pub use pool::WorkerPool;
pub use repositories::{
    JsonLinesRepository, LogRepository, MemoryRepository, ReadingRow, Repository,
};
