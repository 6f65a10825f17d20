use crate::window::{DateWindow, intersect_open};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type AllocationId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    #[default]
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl AllocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Planned => "planned",
            AllocationStatus::Active => "active",
            AllocationStatus::Completed => "completed",
            AllocationStatus::Cancelled => "cancelled",
        }
    }

    /// Only planned and active allocations consume capacity.
    pub fn counts_toward_capacity(&self) -> bool {
        matches!(self, AllocationStatus::Planned | AllocationStatus::Active)
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(AllocationStatus::Planned),
            "active" => Ok(AllocationStatus::Active),
            "completed" => Ok(AllocationStatus::Completed),
            "cancelled" | "canceled" => Ok(AllocationStatus::Cancelled),
            other => Err(format!("unknown allocation status '{other}'")),
        }
    }
}

/// What an allocation commits time to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AllocationTarget {
    Project(String),
    Task(String),
    Phase(String),
}

impl AllocationTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            AllocationTarget::Project(_) => "project",
            AllocationTarget::Task(_) => "task",
            AllocationTarget::Phase(_) => "phase",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            AllocationTarget::Project(id)
            | AllocationTarget::Task(id)
            | AllocationTarget::Phase(id) => id,
        }
    }

    pub fn from_parts(kind: &str, id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        match kind.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(AllocationTarget::Project(id)),
            "task" => Ok(AllocationTarget::Task(id)),
            "phase" => Ok(AllocationTarget::Phase(id)),
            other => Err(format!("unknown allocation target kind '{other}'")),
        }
    }
}

impl fmt::Display for AllocationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// A fractional commitment of a person's working time to a target over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    /// Person the time belongs to.
    pub subject: String,
    pub target: AllocationTarget,
    pub start_date: NaiveDate,
    /// Open-ended when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Share of each working day, 0-100. Missing values contribute nothing.
    #[serde(default)]
    pub allocation_percentage: Option<f64>,
    /// Hours committed per working day at 100%. Missing values contribute nothing.
    #[serde(default)]
    pub hours_per_day: Option<f64>,
    #[serde(default)]
    pub status: AllocationStatus,
    #[serde(default)]
    pub billable: bool,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Allocation {
    pub fn new(
        id: AllocationId,
        subject: impl Into<String>,
        target: AllocationTarget,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Self {
        NewAllocation::new(subject, target, start_date, end_date).into_allocation(id)
    }

    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.allocation_percentage = Some(percentage);
        self
    }

    pub fn with_hours_per_day(mut self, hours: f64) -> Self {
        self.hours_per_day = Some(hours);
        self
    }

    pub fn with_status(mut self, status: AllocationStatus) -> Self {
        self.status = status;
        self
    }

    /// Percentage clamped to [0, 100]; missing or non-finite values read as 0.
    pub fn effective_percentage(&self) -> f64 {
        match self.allocation_percentage {
            Some(pct) if pct.is_finite() => pct.clamp(0.0, 100.0),
            _ => 0.0,
        }
    }

    /// Hours per day; missing, negative or non-finite values read as 0.
    pub fn effective_hours_per_day(&self) -> f64 {
        match self.hours_per_day {
            Some(hours) if hours.is_finite() && hours > 0.0 => hours,
            _ => 0.0,
        }
    }

    /// Weighted hours this allocation books on one working day.
    pub fn daily_hours(&self) -> f64 {
        self.effective_hours_per_day() * (self.effective_percentage() / 100.0)
    }

    pub fn counts_toward_capacity(&self) -> bool {
        self.status.counts_toward_capacity()
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end| date <= end)
    }

    /// `(start, end)` with `None` for an open end.
    pub fn active_window(&self) -> (NaiveDate, Option<NaiveDate>) {
        (self.start_date, self.end_date)
    }

    /// Portion of this allocation that falls inside `query`.
    pub fn overlap(&self, query: &DateWindow) -> Option<DateWindow> {
        let (start, end) = self.active_window();
        intersect_open(start, end, query)
    }
}

/// Fields a caller supplies when creating or editing an allocation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAllocation {
    pub subject: String,
    pub target: AllocationTarget,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub allocation_percentage: Option<f64>,
    #[serde(default)]
    pub hours_per_day: Option<f64>,
    #[serde(default)]
    pub status: AllocationStatus,
    #[serde(default)]
    pub billable: bool,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewAllocation {
    pub fn new(
        subject: impl Into<String>,
        target: AllocationTarget,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            subject: subject.into(),
            target,
            start_date,
            end_date,
            allocation_percentage: Some(100.0),
            hours_per_day: Some(8.0),
            status: AllocationStatus::Active,
            billable: true,
            confirmed: false,
            notes: None,
        }
    }

    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.allocation_percentage = Some(percentage);
        self
    }

    pub fn with_hours_per_day(mut self, hours: f64) -> Self {
        self.hours_per_day = Some(hours);
        self
    }

    pub fn with_status(mut self, status: AllocationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn into_allocation(self, id: AllocationId) -> Allocation {
        Allocation {
            id,
            subject: self.subject,
            target: self.target,
            start_date: self.start_date,
            end_date: self.end_date,
            allocation_percentage: self
                .allocation_percentage
                .map(|pct| if pct.is_finite() { pct.clamp(0.0, 100.0) } else { pct }),
            hours_per_day: self.hours_per_day,
            status: self.status,
            billable: self.billable,
            confirmed: self.confirmed,
            notes: self.notes,
        }
    }
}

impl From<&Allocation> for NewAllocation {
    fn from(allocation: &Allocation) -> Self {
        Self {
            subject: allocation.subject.clone(),
            target: allocation.target.clone(),
            start_date: allocation.start_date,
            end_date: allocation.end_date,
            allocation_percentage: allocation.allocation_percentage,
            hours_per_day: allocation.hours_per_day,
            status: allocation.status,
            billable: allocation.billable,
            confirmed: allocation.confirmed,
            notes: allocation.notes.clone(),
        }
    }
}
