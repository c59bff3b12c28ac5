//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration failed to load or validate
    #[error("Invalid configuration: {0}")]
    Config(#[from] contracts::ContractError),

    /// The control surface could not bind
    #[error("Failed to bind control surface on {addr}: {source}")]
    ControlBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A pipeline half failed to start
    #[error("Failed to start pipeline: {0}")]
    Pipeline(#[from] pipeline::PipelineError),

    /// Storage could not be opened
    #[error("Failed to open storage: {0}")]
    Storage(#[from] persistence::PersistenceError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn control_bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::ControlBind {
            addr: addr.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
