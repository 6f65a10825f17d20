use crate::allocation::{Allocation, AllocationId};
use crate::calendar::working_days_closed_form;
use crate::capacity::{OVERALLOCATION_THRESHOLD, capacity_allocations};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Advisory notice that a subject is booked over 100% on some dates.
///
/// Produced after a write has already been accepted; never blocks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityWarning {
    pub subject: String,
    pub allocation_id: AllocationId,
    pub start: NaiveDate,
    /// `None` when the overlap runs as long as the open-ended allocation does.
    pub end: Option<NaiveDate>,
    /// Highest combined percentage seen inside the run.
    pub total_percentage: f64,
    pub conflicting_allocations: Vec<AllocationId>,
}

impl fmt::Display for CapacityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self
            .end
            .map(|date| date.to_string())
            .unwrap_or_else(|| "open".to_string());
        write!(
            f,
            "{} allocated {:.1}% from {} to {} (allocations {})",
            self.subject,
            self.total_percentage,
            self.start,
            end,
            self.conflicting_allocations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

struct Segment {
    start: NaiveDate,
    end: Option<NaiveDate>,
    total: f64,
    members: Vec<AllocationId>,
}

/// Re-check the changed allocation against everything else its subject holds.
///
/// `allocations` is the full set after the write; it may or may not contain
/// `changed` itself. Sums of allocation percentage only change where another
/// allocation starts or ends, so the span of `changed` is cut at those dates
/// and each piece is checked once. Pieces that contain no working day are
/// ignored, and over-booked pieces separated only by non-working days merge
/// into one warning.
pub fn check_conflicts(changed: &Allocation, allocations: &[Allocation]) -> Vec<CapacityWarning> {
    if !changed.counts_toward_capacity() {
        return Vec::new();
    }

    let others: Vec<&Allocation> = capacity_allocations(&changed.subject, allocations)
        .filter(|allocation| allocation.id != changed.id)
        .filter(|allocation| overlaps(changed, allocation))
        .collect();
    if others.is_empty() {
        return Vec::new();
    }

    let in_span = |date: NaiveDate| {
        date >= changed.start_date && changed.end_date.is_none_or(|end| date <= end)
    };

    let mut breakpoints = vec![changed.start_date];
    for other in &others {
        if in_span(other.start_date) {
            breakpoints.push(other.start_date);
        }
        if let Some(after_end) = other.end_date.and_then(|end| end.succ_opt()) {
            if in_span(after_end) {
                breakpoints.push(after_end);
            }
        }
    }
    breakpoints.sort();
    breakpoints.dedup();

    let mut segments: Vec<Segment> = Vec::new();
    for (idx, start) in breakpoints.iter().copied().enumerate() {
        let end = match breakpoints.get(idx + 1) {
            Some(next) => next.pred_opt(),
            None => changed.end_date,
        };
        // An open tail always reaches a working day within a week.
        let horizon = end.unwrap_or_else(|| {
            start
                .checked_add_signed(Duration::days(6))
                .unwrap_or(NaiveDate::MAX)
        });
        if working_days_closed_form(start, horizon) == 0 {
            continue;
        }

        let mut total = changed.effective_percentage();
        let mut members = vec![changed.id];
        for other in others.iter().filter(|other| other.is_active_on(start)) {
            total += other.effective_percentage();
            members.push(other.id);
        }
        if total > OVERALLOCATION_THRESHOLD {
            segments.push(Segment {
                start,
                end,
                total,
                members,
            });
        }
    }

    merge_segments(changed, segments)
}

fn overlaps(a: &Allocation, b: &Allocation) -> bool {
    let a_end_ok = a.end_date.is_none_or(|end| b.start_date <= end);
    let b_end_ok = b.end_date.is_none_or(|end| a.start_date <= end);
    a_end_ok && b_end_ok
}

/// True when no working day lies strictly between `before` and `after`.
fn only_non_working_between(before: NaiveDate, after: NaiveDate) -> bool {
    match (before.succ_opt(), after.pred_opt()) {
        (Some(first), Some(last)) => working_days_closed_form(first, last) == 0,
        _ => false,
    }
}

fn merge_segments(changed: &Allocation, segments: Vec<Segment>) -> Vec<CapacityWarning> {
    let mut warnings: Vec<CapacityWarning> = Vec::new();
    for segment in segments {
        if let Some(last) = warnings.last_mut() {
            let contiguous = last
                .end
                .is_some_and(|end| only_non_working_between(end, segment.start));
            if contiguous {
                last.end = segment.end;
                last.total_percentage = last.total_percentage.max(segment.total);
                for id in segment.members {
                    if !last.conflicting_allocations.contains(&id) {
                        last.conflicting_allocations.push(id);
                    }
                }
                continue;
            }
        }
        warnings.push(CapacityWarning {
            subject: changed.subject.clone(),
            allocation_id: changed.id,
            start: segment.start,
            end: segment.end,
            total_percentage: segment.total,
            conflicting_allocations: segment.members,
        });
    }
    for warning in &mut warnings {
        warning.conflicting_allocations.sort();
    }
    warnings
}
