//! Persistence error types

use std::path::PathBuf;

use thiserror::Error;

/// Persistence-specific errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A pool needs at least one worker
    #[error("worker count must be > 0")]
    NoWorkers,

    /// The storage file could not be opened
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File storage selected without a path
    #[error("storage kind '{kind}' requires a path")]
    MissingPath { kind: &'static str },

    /// Repository error (from contract)
    #[error("repository error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl PersistenceError {
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}

/// Persistence Result type alias
pub type Result<T> = std::result::Result<T, PersistenceError>;
