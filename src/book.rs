use crate::allocation::{Allocation, AllocationId, AllocationStatus, NewAllocation};
use crate::allocation_validation;
use crate::cache::{CapacityCache, MATERIALIZE_HORIZON_DAYS};
use crate::capacity::{self, CapacitySummary, DailyCapacity};
use crate::conflict::{self, CapacityWarning};
use crate::error::{AllocationError, AllocationResult};
use crate::report::{self, UtilizationReport};
use crate::window::DateWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Result of an accepted write. Warnings never undo the write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub allocation: Allocation,
    #[serde(default)]
    pub warnings: Vec<CapacityWarning>,
}

impl WriteOutcome {
    pub fn is_overallocated(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// The allocation set plus its materialized capacity cache.
///
/// Each write validates, stores, recomputes the cached days it touches and
/// runs the advisory conflict check, all within the same call.
#[derive(Debug, Clone)]
pub struct AllocationBook {
    allocations: BTreeMap<AllocationId, Allocation>,
    next_id: AllocationId,
    cache: CapacityCache,
}

impl Default for AllocationBook {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationBook {
    pub fn new() -> Self {
        Self {
            allocations: BTreeMap::new(),
            next_id: 1,
            cache: CapacityCache::new(),
        }
    }

    /// Rebuild a book from stored allocations, keeping their ids.
    pub fn from_allocations(allocations: Vec<Allocation>) -> AllocationResult<Self> {
        allocation_validation::validate_allocation_collection(&allocations)?;
        let next_id = allocations.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let allocations = allocations.into_iter().map(|a| (a.id, a)).collect();
        Ok(Self {
            allocations,
            next_id,
            cache: CapacityCache::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn get(&self, id: AllocationId) -> Option<&Allocation> {
        self.allocations.get(&id)
    }

    /// All allocations ordered by id.
    pub fn allocations(&self) -> Vec<Allocation> {
        self.allocations.values().cloned().collect()
    }

    pub fn allocations_for(&self, subject: &str) -> Vec<Allocation> {
        self.allocations
            .values()
            .filter(|allocation| allocation.subject == subject)
            .cloned()
            .collect()
    }

    pub fn subjects(&self) -> Vec<String> {
        let subjects: BTreeSet<&str> = self
            .allocations
            .values()
            .map(|allocation| allocation.subject.as_str())
            .collect();
        subjects.into_iter().map(str::to_string).collect()
    }

    pub fn cache(&self) -> &CapacityCache {
        &self.cache
    }

    pub fn create(&mut self, new: NewAllocation) -> AllocationResult<WriteOutcome> {
        let allocation = new.into_allocation(self.next_id);
        allocation_validation::validate_allocation(&allocation)?;
        self.next_id += 1;

        info!(
            id = allocation.id,
            subject = %allocation.subject,
            target = %allocation.target,
            "allocation created"
        );
        self.allocations.insert(allocation.id, allocation.clone());
        self.recompute_span(&allocation);
        Ok(self.outcome(allocation))
    }

    pub fn update(&mut self, id: AllocationId, edit: NewAllocation) -> AllocationResult<WriteOutcome> {
        let previous = self
            .allocations
            .get(&id)
            .cloned()
            .ok_or(AllocationError::NotFound(id))?;
        let allocation = edit.into_allocation(id);
        allocation_validation::validate_allocation(&allocation)?;
        self.replace(previous, allocation)
    }

    pub fn set_status(
        &mut self,
        id: AllocationId,
        status: AllocationStatus,
    ) -> AllocationResult<WriteOutcome> {
        let previous = self
            .allocations
            .get(&id)
            .cloned()
            .ok_or(AllocationError::NotFound(id))?;
        let mut allocation = previous.clone();
        allocation.status = status;
        self.replace(previous, allocation)
    }

    pub fn confirm(&mut self, id: AllocationId) -> AllocationResult<WriteOutcome> {
        let previous = self
            .allocations
            .get(&id)
            .cloned()
            .ok_or(AllocationError::NotFound(id))?;
        let mut allocation = previous.clone();
        allocation.confirmed = true;
        self.replace(previous, allocation)
    }

    pub fn delete(&mut self, id: AllocationId) -> AllocationResult<Allocation> {
        let removed = self
            .allocations
            .remove(&id)
            .ok_or(AllocationError::NotFound(id))?;
        info!(id, subject = %removed.subject, "allocation deleted");
        self.recompute_span(&removed);
        Ok(removed)
    }

    pub fn capacity(&self, subject: &str, window: &DateWindow) -> CapacitySummary {
        let allocations = self.allocations_for(subject);
        capacity::compute_capacity(subject, window.start, window.end, &allocations)
    }

    pub fn availability(&self, subject: &str, window: &DateWindow) -> Vec<DailyCapacity> {
        let allocations = self.allocations_for(subject);
        capacity::daily_availability(subject, window.start, window.end, &allocations)
    }

    /// Availability served from the cache, filling any days not yet materialized.
    ///
    /// Windows beyond the materialization horizon, and subjects holding no
    /// capacity-consuming allocation, are computed directly and left uncached.
    pub fn cached_availability(&mut self, subject: &str, window: &DateWindow) -> Vec<DailyCapacity> {
        if window.is_empty() {
            return Vec::new();
        }
        let allocations = self.allocations_for(subject);
        let holds_capacity = allocations.iter().any(Allocation::counts_toward_capacity);
        if !holds_capacity || window.len_days() > MATERIALIZE_HORIZON_DAYS {
            return capacity::daily_availability(subject, window.start, window.end, &allocations);
        }
        if !self.cache.covers(subject, window) {
            self.cache.refresh(subject, window, &allocations);
        }
        self.cache
            .records(subject, window)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn report(&self, window: &DateWindow) -> UtilizationReport {
        report::team_utilization(window, &[], &self.allocations())
    }

    fn replace(&mut self, previous: Allocation, allocation: Allocation) -> AllocationResult<WriteOutcome> {
        info!(
            id = allocation.id,
            subject = %allocation.subject,
            status = %allocation.status,
            "allocation updated"
        );
        self.allocations.insert(allocation.id, allocation.clone());
        self.recompute_span(&previous);
        self.recompute_span(&allocation);
        Ok(self.outcome(allocation))
    }

    fn outcome(&self, allocation: Allocation) -> WriteOutcome {
        let subject_allocations = self.allocations_for(&allocation.subject);
        let warnings = conflict::check_conflicts(&allocation, &subject_allocations);
        for warning in &warnings {
            warn!(id = allocation.id, %warning, "subject overallocated");
        }
        WriteOutcome {
            allocation,
            warnings,
        }
    }

    /// Spans within the horizon are materialized in full; open-ended and
    /// longer spans only refresh days already in the cache.
    fn recompute_span(&mut self, allocation: &Allocation) {
        let subject_allocations = self.allocations_for(&allocation.subject);
        let window = DateWindow::new(
            allocation.start_date,
            allocation.end_date.unwrap_or(NaiveDate::MAX),
        );
        let written = self
            .cache
            .refresh(&allocation.subject, &window, &subject_allocations);
        debug!(id = allocation.id, written, "capacity cache refreshed");
    }
}
