//! MemoryRepository - keeps readings in process

use std::sync::Mutex;

use contracts::{ContractError, Reading, ReadingRepository};

/// In-process store, used for tests and the loopback demo
#[derive(Debug, Default)]
pub struct MemoryRepository {
    readings: Mutex<Vec<Reading>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything saved so far, in save order
    pub fn readings(&self) -> Vec<Reading> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Reading>> {
        self.readings.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReadingRepository for MemoryRepository {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, reading: &Reading) -> Result<(), ContractError> {
        self.lock().push(reading.clone());
        Ok(())
    }
}
