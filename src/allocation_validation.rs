use crate::allocation::Allocation;
use crate::error::{AllocationError, AllocationResult};
use std::collections::HashSet;

pub const MIN_HOURS_PER_DAY: f64 = 0.5;
pub const MAX_HOURS_PER_DAY: f64 = 24.0;

pub fn validate_allocation(allocation: &Allocation) -> AllocationResult<()> {
    if allocation.subject.trim().is_empty() {
        return Err(AllocationError::validation(format!(
            "allocation {} requires a non-empty subject",
            allocation.id
        )));
    }

    if allocation.target.id().trim().is_empty() {
        return Err(AllocationError::validation(format!(
            "allocation {} requires a non-empty {} id",
            allocation.id,
            allocation.target.kind()
        )));
    }

    if let Some(end) = allocation.end_date {
        if end < allocation.start_date {
            return Err(AllocationError::validation(format!(
                "allocation {} ends on {} before it starts on {}",
                allocation.id, end, allocation.start_date
            )));
        }
    }

    if let Some(hours) = allocation.hours_per_day {
        if !hours.is_finite() || !(MIN_HOURS_PER_DAY..=MAX_HOURS_PER_DAY).contains(&hours) {
            return Err(AllocationError::validation(format!(
                "allocation {} has invalid hours_per_day {} (must be between {} and {})",
                allocation.id, hours, MIN_HOURS_PER_DAY, MAX_HOURS_PER_DAY
            )));
        }
    }

    if let Some(pct) = allocation.allocation_percentage {
        if !pct.is_finite() {
            return Err(AllocationError::validation(format!(
                "allocation {} has non-finite allocation_percentage",
                allocation.id
            )));
        }
    }

    Ok(())
}

pub fn validate_allocation_collection(allocations: &[Allocation]) -> AllocationResult<()> {
    let mut seen_ids = HashSet::with_capacity(allocations.len());
    for allocation in allocations {
        if !seen_ids.insert(allocation.id) {
            return Err(AllocationError::validation(format!(
                "duplicate allocation id {}",
                allocation.id
            )));
        }
        validate_allocation(allocation)?;
    }
    Ok(())
}
