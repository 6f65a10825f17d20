use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Weekdays that count as working days. No holiday calendar is modeled.
pub const WORKING_WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Check if a date falls Monday through Friday
pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Count working days in `[start, end]` by walking the range one date at a time.
///
/// Returns 0 when `start > end`.
pub fn working_days(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut count = 0;
    let mut current = start;

    while current <= end {
        if is_working_day(current) {
            count += 1;
        }
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    count
}

/// Count working days in `[start, end]` from full weeks plus the remainder.
///
/// Agrees with [`working_days`] for every input, including `start > end`.
pub fn working_days_closed_form(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }
    let total = (end - start).num_days() + 1;
    let full_weeks = total / 7;
    let remainder = total % 7;

    let mut count = full_weeks * WORKING_WEEKDAYS.len() as i64;
    // The tail never steps past `end`.
    let tail_start = start + Duration::days(full_weeks * 7);
    for offset in 0..remainder {
        if is_working_day(tail_start + Duration::days(offset)) {
            count += 1;
        }
    }
    count
}

/// Get all working dates in `[start, end]`
pub fn working_dates(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;

    while current <= end {
        if is_working_day(current) {
            days.push(current);
        }
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    days
}

/// Find the first working day on or after `from`, stopping at the last representable date
pub fn next_working_day(from: NaiveDate) -> NaiveDate {
    let mut current = from;
    while !is_working_day(current) {
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}
