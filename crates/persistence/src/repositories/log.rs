//! LogRepository - logs readings via tracing

use contracts::{ContractError, Reading, ReadingRepository};
use tracing::info;

/// Repository that only logs, for dry runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRepository;

impl ReadingRepository for LogRepository {
    fn name(&self) -> &str {
        "log"
    }

    async fn save(&self, reading: &Reading) -> Result<(), ContractError> {
        info!(
            value = reading.value,
            sensor_type = %reading.sensor_type,
            id1 = %reading.id1,
            id2 = %reading.id2,
            ts = %reading.timestamp,
            "reading"
        );
        Ok(())
    }
}
