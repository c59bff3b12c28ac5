//! Pipeline error types

use thiserror::Error;

/// Errors raised while assembling a pipeline half
///
/// Once running, components report failures through the observer instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("buffer error: {0}")]
    Buffer(#[from] buffer::BufferError),

    #[error("ingestion error: {0}")]
    Ingestion(#[from] ingestion::IngestionError),

    #[error("transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("persistence error: {0}")]
    Persistence(#[from] persistence::PersistenceError),
}

/// Pipeline Result type alias
pub type Result<T> = std::result::Result<T, PipelineError>;
