use crate::allocation::Allocation;
use crate::capacity::{self, CapacitySummary, DailyCapacity, round_one_decimal};
use crate::window::DateWindow;
use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationStatus {
    Overallocated,
    OnTrack,
    Underutilized,
}

impl UtilizationStatus {
    pub fn classify(summary: &CapacitySummary) -> Self {
        if summary.is_overallocated {
            UtilizationStatus::Overallocated
        } else if summary.is_underutilized {
            UtilizationStatus::Underutilized
        } else {
            UtilizationStatus::OnTrack
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UtilizationStatus::Overallocated => "overallocated",
            UtilizationStatus::OnTrack => "on_track",
            UtilizationStatus::Underutilized => "underutilized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectUtilization {
    pub summary: CapacitySummary,
    pub status: UtilizationStatus,
    /// Allocations of this subject that overlap the window and consume capacity.
    pub allocation_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub subjects: Vec<SubjectUtilization>,
    pub total_available_hours: f64,
    pub total_allocated_hours: f64,
    pub overall_utilization_percentage: f64,
    pub overallocated_count: usize,
    pub on_track_count: usize,
    pub underutilized_count: usize,
}

impl UtilizationReport {
    pub fn find(&self, subject: &str) -> Option<&SubjectUtilization> {
        self.subjects.iter().find(|entry| entry.summary.subject == subject)
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("window={}..={}", self.start, self.end));
        parts.push(format!("subjects={}", self.subjects.len()));
        parts.push(format!(
            "utilization={}%",
            round_one_decimal(self.overall_utilization_percentage)
        ));
        if self.overallocated_count > 0 {
            parts.push(format!("over={}", self.overallocated_count));
        }
        if self.on_track_count > 0 {
            parts.push(format!("on_track={}", self.on_track_count));
        }
        if self.underutilized_count > 0 {
            parts.push(format!("under={}", self.underutilized_count));
        }
        parts.join(", ")
    }

    /// One row per subject, hours rounded for display.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let rows: Vec<CapacitySummary> = self
            .subjects
            .iter()
            .map(|entry| entry.summary.rounded())
            .collect();
        df!(
            "subject" => rows.iter().map(|s| s.subject.as_str()).collect::<Vec<_>>(),
            "working_days" => rows.iter().map(|s| s.working_days).collect::<Vec<_>>(),
            "available_hours" => rows.iter().map(|s| s.available_hours).collect::<Vec<_>>(),
            "allocated_hours" => rows.iter().map(|s| s.allocated_hours).collect::<Vec<_>>(),
            "remaining_hours" => rows.iter().map(|s| s.remaining_hours).collect::<Vec<_>>(),
            "utilization_pct" => rows.iter().map(|s| s.utilization_percentage).collect::<Vec<_>>(),
            "status" => self.subjects.iter().map(|e| e.status.as_str()).collect::<Vec<_>>(),
        )
    }
}

/// Utilization for every subject in `roster` or holding an allocation.
///
/// Subjects are computed in parallel; rows come back sorted by subject.
pub fn team_utilization(
    window: &DateWindow,
    roster: &[String],
    allocations: &[Allocation],
) -> UtilizationReport {
    let mut by_subject: BTreeMap<&str, Vec<Allocation>> = BTreeMap::new();
    for subject in roster {
        by_subject.entry(subject.as_str()).or_default();
    }
    for allocation in allocations {
        by_subject
            .entry(allocation.subject.as_str())
            .or_default()
            .push(allocation.clone());
    }

    let entries: Vec<(&str, Vec<Allocation>)> = by_subject.into_iter().collect();
    let subjects: Vec<SubjectUtilization> = entries
        .into_par_iter()
        .map(|(subject, owned)| {
            let summary = capacity::compute_capacity(subject, window.start, window.end, &owned);
            let allocation_count = capacity::capacity_allocations(subject, &owned)
                .filter(|allocation| allocation.overlap(window).is_some())
                .count();
            SubjectUtilization {
                status: UtilizationStatus::classify(&summary),
                summary,
                allocation_count,
            }
        })
        .collect();

    let total_available_hours: f64 = subjects.iter().map(|e| e.summary.available_hours).sum();
    let total_allocated_hours: f64 = subjects.iter().map(|e| e.summary.allocated_hours).sum();
    let count = |status: UtilizationStatus| subjects.iter().filter(|e| e.status == status).count();

    let report = UtilizationReport {
        start: window.start,
        end: window.end,
        total_available_hours,
        total_allocated_hours,
        overall_utilization_percentage: capacity::utilization_percentage(
            total_allocated_hours,
            total_available_hours,
        ),
        overallocated_count: count(UtilizationStatus::Overallocated),
        on_track_count: count(UtilizationStatus::OnTrack),
        underutilized_count: count(UtilizationStatus::Underutilized),
        subjects,
    };
    info!(summary = %report.to_cli_summary(), "utilization report built");
    report
}

/// Daily capacity rows as a frame with a polars `Date` column.
pub fn availability_frame(records: &[DailyCapacity]) -> PolarsResult<DataFrame> {
    let dates = Series::new(
        "date".into(),
        records
            .iter()
            .map(|r| date_to_i32(r.date))
            .collect::<Vec<_>>(),
    )
    .cast(&DataType::Date)?;

    let mut frame = df!(
        "subject" => records.iter().map(|r| r.subject.as_str()).collect::<Vec<_>>(),
        "working_day" => records.iter().map(|r| r.is_working_day).collect::<Vec<_>>(),
        "available_hours" => records.iter().map(|r| round_one_decimal(r.available_hours)).collect::<Vec<_>>(),
        "allocated_hours" => records.iter().map(|r| round_one_decimal(r.allocated_hours)).collect::<Vec<_>>(),
        "remaining_hours" => records.iter().map(|r| round_one_decimal(r.remaining_hours)).collect::<Vec<_>>(),
        "overallocated" => records.iter().map(|r| r.is_overallocated).collect::<Vec<_>>(),
    )?;
    frame.with_column(dates)?;
    frame.select([
        "date",
        "subject",
        "working_day",
        "available_hours",
        "allocated_hours",
        "remaining_hours",
        "overallocated",
    ])
}

/// Allocation listing for tabular display.
pub fn allocations_frame(allocations: &[Allocation]) -> PolarsResult<DataFrame> {
    let fmt_opt = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    df!(
        "id" => allocations.iter().map(|a| a.id).collect::<Vec<_>>(),
        "subject" => allocations.iter().map(|a| a.subject.as_str()).collect::<Vec<_>>(),
        "target" => allocations.iter().map(|a| a.target.to_string()).collect::<Vec<_>>(),
        "start" => allocations.iter().map(|a| a.start_date.to_string()).collect::<Vec<_>>(),
        "end" => allocations
            .iter()
            .map(|a| a.end_date.map(|d| d.to_string()).unwrap_or_else(|| "open".to_string()))
            .collect::<Vec<_>>(),
        "pct" => allocations.iter().map(|a| fmt_opt(a.allocation_percentage)).collect::<Vec<_>>(),
        "hours_per_day" => allocations.iter().map(|a| fmt_opt(a.hours_per_day)).collect::<Vec<_>>(),
        "status" => allocations.iter().map(|a| a.status.as_str()).collect::<Vec<_>>(),
        "confirmed" => allocations.iter().map(|a| a.confirmed).collect::<Vec<_>>(),
    )
}

fn date_to_i32(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

/// Render a frame as a bordered text table.
pub fn render_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let cells: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| {
            columns
                .iter()
                .map(|col| match col.get(row_idx) {
                    Ok(AnyValue::Null) | Err(_) => String::new(),
                    Ok(AnyValue::String(s)) => s.to_string(),
                    Ok(av) => av.to_string(),
                })
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(value.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}
