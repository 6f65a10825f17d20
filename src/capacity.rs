//! Capacity arithmetic over an explicit allocation set.
//!
//! Everything here is a pure function of its inputs. Hours accumulate as
//! `f64` and are only rounded by [`CapacitySummary::rounded`] for display.

use crate::allocation::Allocation;
use crate::calendar::{is_working_day, working_days_closed_form};
use crate::window::DateWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Nominal hours in one working day.
pub const NOMINAL_HOURS_PER_DAY: f64 = 8.0;
/// Utilization above this percentage is overallocated.
pub const OVERALLOCATION_THRESHOLD: f64 = 100.0;
/// Utilization below this percentage is underutilized.
pub const UNDERUTILIZATION_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitySummary {
    pub subject: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub working_days: i64,
    pub available_hours: f64,
    pub allocated_hours: f64,
    pub remaining_hours: f64,
    pub utilization_percentage: f64,
    pub is_overallocated: bool,
    pub is_underutilized: bool,
}

impl CapacitySummary {
    /// Copy with hours and percentage rounded to one decimal place.
    pub fn rounded(&self) -> Self {
        Self {
            available_hours: round_one_decimal(self.available_hours),
            allocated_hours: round_one_decimal(self.allocated_hours),
            remaining_hours: round_one_decimal(self.remaining_hours),
            utilization_percentage: round_one_decimal(self.utilization_percentage),
            ..self.clone()
        }
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start, self.end)
    }

    pub fn to_cli_summary(&self) -> String {
        let rounded = self.rounded();
        let mut parts = vec![
            format!("subject={}", self.subject),
            format!("window={}", self.window()),
            format!("working_days={}", self.working_days),
            format!("available={}", rounded.available_hours),
            format!("allocated={}", rounded.allocated_hours),
            format!("remaining={}", rounded.remaining_hours),
            format!("utilization={}%", rounded.utilization_percentage),
        ];
        if self.is_overallocated {
            parts.push("OVERALLOCATED".to_string());
        }
        if self.is_underutilized {
            parts.push("underutilized".to_string());
        }
        parts.join(", ")
    }
}

/// Capacity of one subject on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCapacity {
    pub subject: String,
    pub date: NaiveDate,
    pub available_hours: f64,
    pub allocated_hours: f64,
    pub remaining_hours: f64,
    pub is_working_day: bool,
    pub is_overallocated: bool,
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `allocated / available * 100`, or 0 when nothing is available.
pub fn utilization_percentage(allocated_hours: f64, available_hours: f64) -> f64 {
    if available_hours > 0.0 {
        allocated_hours / available_hours * 100.0
    } else {
        0.0
    }
}

pub fn is_overallocated(allocated_hours: f64, available_hours: f64) -> bool {
    allocated_hours > available_hours
}

pub fn is_underutilized(utilization_percentage: f64) -> bool {
    utilization_percentage < UNDERUTILIZATION_THRESHOLD
}

/// Allocations of `subject` that currently consume capacity.
pub fn capacity_allocations<'a>(
    subject: &'a str,
    allocations: &'a [Allocation],
) -> impl Iterator<Item = &'a Allocation> + 'a {
    allocations
        .iter()
        .filter(move |allocation| allocation.subject == subject)
        .filter(|allocation| allocation.counts_toward_capacity())
}

/// Weighted hours one allocation books inside `query`.
pub fn allocation_hours_in(allocation: &Allocation, query: &DateWindow) -> f64 {
    match allocation.overlap(query) {
        Some(overlap) => {
            working_days_closed_form(overlap.start, overlap.end) as f64 * allocation.daily_hours()
        }
        None => 0.0,
    }
}

pub fn compute_capacity(
    subject: &str,
    start: NaiveDate,
    end: NaiveDate,
    allocations: &[Allocation],
) -> CapacitySummary {
    let query = DateWindow::new(start, end);
    let days = working_days_closed_form(start, end);
    let available_hours = days as f64 * NOMINAL_HOURS_PER_DAY;

    let allocated_hours: f64 = capacity_allocations(subject, allocations)
        .map(|allocation| allocation_hours_in(allocation, &query))
        .sum();

    let utilization = utilization_percentage(allocated_hours, available_hours);
    debug!(
        subject,
        window = %query,
        available_hours,
        allocated_hours,
        utilization,
        "computed capacity"
    );

    CapacitySummary {
        subject: subject.to_string(),
        start,
        end,
        working_days: days,
        available_hours,
        allocated_hours,
        remaining_hours: available_hours - allocated_hours,
        utilization_percentage: utilization,
        is_overallocated: is_overallocated(allocated_hours, available_hours),
        is_underutilized: is_underutilized(utilization),
    }
}

/// One record per calendar day in `[start, end]`.
///
/// Weekends are included with zero available and zero allocated hours so the
/// sequence is contiguous. Empty when `start > end`.
pub fn daily_availability(
    subject: &str,
    start: NaiveDate,
    end: NaiveDate,
    allocations: &[Allocation],
) -> Vec<DailyCapacity> {
    let query = DateWindow::new(start, end);
    let relevant: Vec<&Allocation> = capacity_allocations(subject, allocations)
        .filter(|allocation| allocation.overlap(&query).is_some())
        .collect();

    query
        .days()
        .map(|date| daily_capacity(subject, date, &relevant))
        .collect()
}

pub(crate) fn daily_capacity(
    subject: &str,
    date: NaiveDate,
    allocations: &[&Allocation],
) -> DailyCapacity {
    let working = is_working_day(date);
    let available_hours = if working { NOMINAL_HOURS_PER_DAY } else { 0.0 };
    let allocated_hours: f64 = if working {
        allocations
            .iter()
            .filter(|allocation| allocation.is_active_on(date))
            .map(|allocation| allocation.daily_hours())
            .sum()
    } else {
        0.0
    };

    DailyCapacity {
        subject: subject.to_string(),
        date,
        available_hours,
        allocated_hours,
        remaining_hours: available_hours - allocated_hours,
        is_working_day: working,
        is_overallocated: is_overallocated(allocated_hours, available_hours),
    }
}
