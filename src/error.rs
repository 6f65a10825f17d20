use crate::allocation::AllocationId;
use thiserror::Error;

pub type AllocationResult<T> = Result<T, AllocationError>;

/// Failures on the allocation write path.
///
/// Capacity queries never fail; degenerate input yields zero results instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("allocation {0} not found")]
    NotFound(AllocationId),
}

impl AllocationError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
