use crate::allocation::Allocation;
use crate::capacity::{DailyCapacity, capacity_allocations, daily_capacity};
use crate::window::DateWindow;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Longest window, in calendar days, that one refresh materializes.
pub const MATERIALIZE_HORIZON_DAYS: i64 = 366;
/// Default bound on cached `(subject, date)` records.
pub const DEFAULT_MAX_ENTRIES: usize = 200_000;

/// Materialized [`DailyCapacity`] records keyed by `(subject, date)`.
///
/// Derived from the allocation set and disposable: dropping any entry only
/// costs a recompute. Growth is bounded twice: a refresh never adds more than
/// [`MATERIALIZE_HORIZON_DAYS`] days, and once `max_entries` would be
/// exceeded everything outside the window being filled is evicted.
#[derive(Debug, Clone)]
pub struct CapacityCache {
    records: BTreeMap<(String, NaiveDate), DailyCapacity>,
    max_entries: usize,
}

impl Default for CapacityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CapacityCache {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Never below one horizon, so a single refresh always fits.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            max_entries: max_entries.max(MATERIALIZE_HORIZON_DAYS as usize),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, subject: &str, date: NaiveDate) -> Option<&DailyCapacity> {
        self.records.get(&(subject.to_string(), date))
    }

    /// Cached records of `subject` inside `window`, in date order.
    pub fn records(&self, subject: &str, window: &DateWindow) -> Vec<&DailyCapacity> {
        if window.is_empty() {
            return Vec::new();
        }
        let lower = (subject.to_string(), window.start);
        let upper = (subject.to_string(), window.end);
        self.records.range(lower..=upper).map(|(_, record)| record).collect()
    }

    /// Whether every day of `window` is cached for `subject`.
    pub fn covers(&self, subject: &str, window: &DateWindow) -> bool {
        self.records(subject, window).len() as i64 == window.len_days()
    }

    /// Drop every cached day of `subject` inside `window`.
    pub fn invalidate(&mut self, subject: &str, window: &DateWindow) -> usize {
        let keys: Vec<(String, NaiveDate)> = self
            .records(subject, window)
            .into_iter()
            .map(|record| (record.subject.clone(), record.date))
            .collect();
        for key in &keys {
            self.records.remove(key);
        }
        keys.len()
    }

    pub fn invalidate_subject(&mut self, subject: &str) {
        self.records.retain(|(cached_subject, _), _| cached_subject != subject);
    }

    /// Recompute every day of `subject` inside `window` from `allocations`.
    ///
    /// Windows longer than [`MATERIALIZE_HORIZON_DAYS`] fall back to
    /// [`refresh_cached`](Self::refresh_cached). Returns the number of days written.
    pub fn refresh(
        &mut self,
        subject: &str,
        window: &DateWindow,
        allocations: &[Allocation],
    ) -> usize {
        if window.is_empty() {
            return 0;
        }
        if window.len_days() > MATERIALIZE_HORIZON_DAYS {
            return self.refresh_cached(subject, window, allocations);
        }
        self.make_room(subject, window);

        let relevant = relevant_allocations(subject, window, allocations);
        let mut written = 0;
        for date in window.days() {
            let record = daily_capacity(subject, date, &relevant);
            self.records.insert((subject.to_string(), date), record);
            written += 1;
        }
        written
    }

    /// Recompute only the days of `subject` inside `window` that are already cached.
    ///
    /// Used for open-ended and long spans, which are not materialized in full.
    pub fn refresh_cached(
        &mut self,
        subject: &str,
        window: &DateWindow,
        allocations: &[Allocation],
    ) -> usize {
        let dates: Vec<NaiveDate> = self
            .records(subject, window)
            .into_iter()
            .map(|record| record.date)
            .collect();
        let relevant = relevant_allocations(subject, window, allocations);
        for date in &dates {
            let record = daily_capacity(subject, *date, &relevant);
            self.records.insert((subject.to_string(), *date), record);
        }
        dates.len()
    }

    fn make_room(&mut self, subject: &str, window: &DateWindow) {
        let missing = window.len_days() as usize - self.records(subject, window).len();
        if self.records.len() + missing <= self.max_entries {
            return;
        }
        let before = self.records.len();
        self.records
            .retain(|(cached_subject, date), _| cached_subject == subject && window.contains(*date));
        debug!(
            subject,
            evicted = before - self.records.len(),
            "capacity cache full, evicted records"
        );
    }
}

fn relevant_allocations<'a>(
    subject: &'a str,
    window: &DateWindow,
    allocations: &'a [Allocation],
) -> Vec<&'a Allocation> {
    capacity_allocations(subject, allocations)
        .filter(|allocation| allocation.overlap(window).is_some())
        .collect()
}
