use chrono::{Datelike, Duration, NaiveDate, Weekday};
use proptest::prelude::*;
use resource_capacity::calendar::{
    is_working_day, next_working_day, working_dates, working_days, working_days_closed_form,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn brute_force(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut count = 0;
    let mut current = start;
    while current <= end {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    count
}

#[test]
fn weekends_are_not_working_days() {
    // 2025-01-04 is a Saturday, 2025-01-05 is a Sunday
    assert!(!is_working_day(d(2025, 1, 4)));
    assert!(!is_working_day(d(2025, 1, 5)));
    assert!(is_working_day(d(2025, 1, 6)));
}

#[test]
fn holidays_are_not_modeled() {
    // New Year's Day and Christmas are ordinary weekdays here.
    assert!(is_working_day(d(2025, 1, 1)));
    assert!(is_working_day(d(2025, 12, 25)));
}

#[test]
fn every_window_within_a_week_matches_enumeration_for_a_month() {
    let month_start = d(2025, 3, 1);
    let month_end = d(2025, 3, 31);
    let mut start = month_start;
    while start <= month_end {
        for span in 0..7 {
            let end = start + Duration::days(span);
            let expected = brute_force(start, end);
            assert_eq!(working_days(start, end), expected, "{start}..={end}");
            assert_eq!(working_days_closed_form(start, end), expected, "{start}..={end}");
        }
        start = start + Duration::days(1);
    }
}

#[test]
fn reversed_range_counts_zero() {
    assert_eq!(working_days(d(2025, 1, 10), d(2025, 1, 6)), 0);
    assert_eq!(working_days_closed_form(d(2025, 1, 10), d(2025, 1, 6)), 0);
}

#[test]
fn single_day_range() {
    assert_eq!(working_days(d(2025, 1, 8), d(2025, 1, 8)), 1);
    assert_eq!(working_days(d(2025, 1, 11), d(2025, 1, 11)), 0);
}

#[test]
fn full_months() {
    // January 2025 starts on a Wednesday; February 2025 is exactly four weeks.
    assert_eq!(working_days(d(2025, 1, 1), d(2025, 1, 31)), 23);
    assert_eq!(working_days(d(2025, 2, 1), d(2025, 2, 28)), 20);
}

#[test]
fn working_dates_and_count_match() {
    let start = d(2025, 1, 6);
    let end = d(2025, 1, 19);
    let dates = working_dates(start, end);
    assert_eq!(dates.len() as i64, working_days(start, end));
    assert_eq!(dates.first().copied(), Some(start));
    assert_eq!(dates.last().copied(), Some(d(2025, 1, 17)));
}

#[test]
fn next_working_day_from_friday_stays() {
    assert_eq!(next_working_day(d(2025, 1, 3)), d(2025, 1, 3));
    assert_eq!(next_working_day(d(2025, 1, 5)), d(2025, 1, 6));
}

#[test]
fn windows_ending_on_the_last_representable_date() {
    let end = NaiveDate::MAX;
    let start = end - Duration::days(13);
    // Any fourteen consecutive days hold exactly two weekends.
    assert_eq!(working_days(start, end), 10);
    assert_eq!(working_days_closed_form(start, end), 10);
    assert_eq!(brute_force(start, end), 10);
    assert_eq!(working_dates(start, end).len(), 10);
    assert_eq!(working_days(end, end), working_days_closed_form(end, end));
    assert_eq!(next_working_day(end), end);
}

proptest! {
    #[test]
    fn closed_form_agrees_with_iteration(start_offset in 0i64..3_000, span in -10i64..800) {
        let start = d(2020, 1, 1) + Duration::days(start_offset);
        let end = start + Duration::days(span);
        prop_assert_eq!(working_days_closed_form(start, end), working_days(start, end));
    }
}
