use crate::allocation::{Allocation, AllocationId, AllocationStatus, NewAllocation};
use crate::allocation_validation;
use crate::book::WriteOutcome;
use crate::capacity::DailyCapacity;
use crate::error::AllocationError;
use crate::window::DateWindow;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Durable home for allocations and their capacity cache.
///
/// Every write recomputes the cached capacity rows it touches inside the
/// same unit of work and reports advisory overallocation warnings.
pub trait AllocationStore {
    fn create_allocation(&self, new: NewAllocation) -> PersistenceResult<WriteOutcome>;
    fn update_allocation(
        &self,
        id: AllocationId,
        edit: NewAllocation,
    ) -> PersistenceResult<WriteOutcome>;
    fn set_status(
        &self,
        id: AllocationId,
        status: AllocationStatus,
    ) -> PersistenceResult<WriteOutcome>;
    fn confirm(&self, id: AllocationId) -> PersistenceResult<WriteOutcome>;
    fn delete_allocation(&self, id: AllocationId) -> PersistenceResult<Allocation>;
    fn load_allocations(&self) -> PersistenceResult<Vec<Allocation>>;
    fn load_subject_allocations(&self, subject: &str) -> PersistenceResult<Vec<Allocation>>;
    fn cached_capacity(
        &self,
        subject: &str,
        window: &DateWindow,
    ) -> PersistenceResult<Vec<DailyCapacity>>;
}

pub fn validate_allocations(allocations: &[Allocation]) -> PersistenceResult<()> {
    allocation_validation::validate_allocation_collection(allocations)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    load_allocations_from_csv, load_allocations_from_json, save_allocations_to_csv,
    save_allocations_to_json,
};
