//! Repository implementations

mod json_lines;
mod log;
mod memory;

pub use json_lines::{JsonLinesRepository, ReadingRow};
pub use log::LogRepository;
pub use memory::MemoryRepository;

use contracts::{ContractError, Reading, ReadingRepository, StorageConfig, StorageKind};
use tracing::{info, instrument};

use crate::error::{PersistenceError, Result};

/// Repository selected from configuration
pub enum Repository {
    Memory(MemoryRepository),
    JsonLines(JsonLinesRepository),
    Log(LogRepository),
}

impl Repository {
    /// Build the repository described by `[receiver.storage]`
    #[instrument(name = "repository_from_config", skip(config), fields(kind = ?config.kind))]
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.kind {
            StorageKind::Memory => Ok(Self::Memory(MemoryRepository::new())),
            StorageKind::Log => Ok(Self::Log(LogRepository)),
            StorageKind::JsonLines => {
                let path = config
                    .path
                    .as_ref()
                    .ok_or(PersistenceError::MissingPath { kind: "json_lines" })?;
                let repository = JsonLinesRepository::open(path).await?;
                info!(path = %repository.path().display(), "json lines storage ready");
                Ok(Self::JsonLines(repository))
            }
        }
    }
}

impl ReadingRepository for Repository {
    fn name(&self) -> &str {
        match self {
            Self::Memory(r) => r.name(),
            Self::JsonLines(r) => r.name(),
            Self::Log(r) => r.name(),
        }
    }

    async fn save(&self, reading: &Reading) -> std::result::Result<(), ContractError> {
        match self {
            Self::Memory(r) => r.save(reading).await,
            Self::JsonLines(r) => r.save(reading).await,
            Self::Log(r) => r.save(reading).await,
        }
    }
}
