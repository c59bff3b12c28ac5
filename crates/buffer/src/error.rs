//! Buffer error types

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("buffer '{name}' needs a capacity of at least 1")]
    ZeroCapacity { name: String },
}
