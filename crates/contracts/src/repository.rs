//! ReadingRepository trait - persistence interface
//!
//! Storage collaborators implement this; the worker pool only ever calls `save`.

use crate::{ContractError, Reading};

/// Persistence capability for readings
///
/// Treated as stateless by the pipeline: the same repository is shared by all
/// workers, so implementations synchronize internally where needed.
#[trait_variant::make(ReadingRepository: Send)]
pub trait LocalReadingRepository {
    /// Repository name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one reading
    ///
    /// # Errors
    /// Returns a save error; the caller reports it and moves on.
    async fn save(&self, reading: &Reading) -> Result<(), ContractError>;
}
