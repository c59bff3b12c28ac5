//! Ingestion error types

use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// `start` called on a running generator
    #[error("generator is already running")]
    AlreadyRunning,

    /// `start` called after `stop`
    #[error("generator has been stopped and cannot be restarted")]
    Stopped,
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
