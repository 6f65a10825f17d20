use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed date interval `[start, end]`.
///
/// A window with `start > end` is allowed and is simply empty; every query
/// over it yields zero or nothing rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// The calendar month containing `today`. This is the default reporting window.
    pub fn current_month(today: NaiveDate) -> Self {
        let start = today.with_day(1).unwrap_or(today);
        let next_month = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        };
        let end = next_month.and_then(|first| first.pred_opt()).unwrap_or(today);
        Self::new(start, end)
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, 0 when empty.
    pub fn len_days(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() + 1
        }
    }

    pub fn intersect(&self, other: &DateWindow) -> Option<DateWindow> {
        intersect_open(self.start, Some(self.end), other)
    }

    pub fn days(&self) -> DateIter {
        DateIter {
            next: Some(self.start),
            end: self.end,
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Iterator over every calendar day of a [`DateWindow`].
#[derive(Debug, Clone)]
pub struct DateIter {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DateIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.filter(|date| *date <= self.end)?;
        self.next = current.succ_opt();
        Some(current)
    }
}

/// Intersect a possibly open-ended `[start, end]` range with a bounded query window.
///
/// An absent `end` is capped at the query window's end. Returns `None` when the
/// overlap is empty.
pub fn intersect_open(
    start: NaiveDate,
    end: Option<NaiveDate>,
    query: &DateWindow,
) -> Option<DateWindow> {
    let lower = start.max(query.start);
    let upper = end.unwrap_or(query.end).min(query.end);
    if lower > upper {
        None
    } else {
        Some(DateWindow::new(lower, upper))
    }
}

/// Source of "today" for now-relative windows.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Reads the local system date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same date. Used by tests and replayed reports.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
