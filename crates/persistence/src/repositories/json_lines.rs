//! JsonLinesRepository - append-only JSON-lines file

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{ContractError, Reading, ReadingRepository};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::{PersistenceError, Result};

/// One stored row: the `sensor_readings` columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRow {
    pub value: f64,
    pub sensor_type: String,
    pub id1: String,
    pub id2: String,
    pub ts: DateTime<Utc>,
}

impl From<&Reading> for ReadingRow {
    fn from(r: &Reading) -> Self {
        Self {
            value: r.value,
            sensor_type: r.sensor_type.clone(),
            id1: r.id1.clone(),
            id2: r.id2.clone(),
            ts: r.timestamp,
        }
    }
}

/// Appends one JSON object per reading
pub struct JsonLinesRepository {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl JsonLinesRepository {
    /// Open (or create) `path` for appending, creating parent directories
    #[instrument(name = "json_lines_open", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::open(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| PersistenceError::open(&path, e))?;
        debug!("json lines file opened");

        Ok(Self {
            path,
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(reading: &Reading) -> std::result::Result<Vec<u8>, ContractError> {
        let mut line = serde_json::to_vec(&ReadingRow::from(reading))
            .map_err(|e| ContractError::repository_save("json_lines", e.to_string()))?;
        line.push(b'\n');
        Ok(line)
    }
}

impl ReadingRepository for JsonLinesRepository {
    fn name(&self) -> &str {
        "json_lines"
    }

    async fn save(&self, reading: &Reading) -> std::result::Result<(), ContractError> {
        let line = Self::encode(reading)?;
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
