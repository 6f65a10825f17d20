pub mod allocation;
pub(crate) mod allocation_validation;
pub mod book;
pub mod cache;
pub mod calendar;
pub mod capacity;
pub mod config;
pub mod conflict;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod logging;
pub mod persistence;
pub mod report;
pub mod window;

pub use allocation::{Allocation, AllocationId, AllocationStatus, AllocationTarget, NewAllocation};
pub use book::{AllocationBook, WriteOutcome};
pub use cache::CapacityCache;
pub use calendar::{is_working_day, working_days, working_days_closed_form};
pub use capacity::{
    CapacitySummary, DailyCapacity, NOMINAL_HOURS_PER_DAY, OVERALLOCATION_THRESHOLD,
    UNDERUTILIZATION_THRESHOLD, compute_capacity, daily_availability,
};
pub use config::{ConfigError, ServiceConfig};
pub use conflict::{CapacityWarning, check_conflicts};
pub use error::{AllocationError, AllocationResult};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteAllocationStore;
pub use persistence::{
    AllocationStore, PersistenceError, load_allocations_from_csv, load_allocations_from_json,
    save_allocations_to_csv, save_allocations_to_json,
};
pub use report::{SubjectUtilization, UtilizationReport, UtilizationStatus, team_utilization};
pub use window::{Clock, DateWindow, FixedClock, SystemClock};
