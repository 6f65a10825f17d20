use chrono::NaiveDate;
use resource_capacity::{
    AllocationBook, AllocationError, AllocationStatus, AllocationTarget, DateWindow,
    NewAllocation,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new(subject: &str, start: NaiveDate, end: Option<NaiveDate>, pct: f64) -> NewAllocation {
    NewAllocation::new(subject, AllocationTarget::Project("apollo".into()), start, end)
        .with_percentage(pct)
}

#[test]
fn create_assigns_sequential_ids() {
    let mut book = AllocationBook::new();
    let first = book
        .create(new("ana", d(2025, 1, 6), Some(d(2025, 1, 10)), 50.0))
        .unwrap();
    let second = book
        .create(new("ben", d(2025, 1, 6), None, 25.0))
        .unwrap();

    assert_eq!(first.allocation.id, 1);
    assert_eq!(second.allocation.id, 2);
    assert_eq!(book.len(), 2);
    assert_eq!(book.subjects(), vec!["ana".to_string(), "ben".to_string()]);
}

#[test]
fn invalid_allocation_is_rejected_and_not_stored() {
    let mut book = AllocationBook::new();
    let err = book
        .create(new("ana", d(2025, 1, 10), Some(d(2025, 1, 6)), 50.0))
        .unwrap_err();
    assert!(matches!(err, AllocationError::Validation(_)));

    let err = book
        .create(new("", d(2025, 1, 6), None, 50.0))
        .unwrap_err();
    assert!(matches!(err, AllocationError::Validation(_)));
    assert!(book.is_empty());
}

#[test]
fn overbooking_is_accepted_with_a_warning() {
    let mut book = AllocationBook::new();
    book.create(new("ana", d(2025, 1, 6), Some(d(2025, 1, 31)), 60.0))
        .unwrap();
    let outcome = book
        .create(new("ana", d(2025, 1, 13), Some(d(2025, 1, 17)), 60.0))
        .unwrap();

    assert!(outcome.is_overallocated());
    assert_eq!(outcome.warnings[0].total_percentage, 120.0);
    assert_eq!(book.len(), 2);

    let window = DateWindow::new(d(2025, 1, 13), d(2025, 1, 17));
    assert!(book.capacity("ana", &window).is_overallocated);
}

#[test]
fn write_refreshes_cached_days_in_the_same_call() {
    let mut book = AllocationBook::new();
    let created = book
        .create(new("ana", d(2025, 1, 6), Some(d(2025, 1, 10)), 50.0))
        .unwrap();

    let monday = book.cache().get("ana", d(2025, 1, 6)).unwrap();
    assert_eq!(monday.allocated_hours, 4.0);

    let mut edit = NewAllocation::from(&created.allocation);
    edit.allocation_percentage = Some(100.0);
    edit.end_date = Some(d(2025, 1, 8));
    book.update(created.allocation.id, edit).unwrap();

    assert_eq!(book.cache().get("ana", d(2025, 1, 6)).unwrap().allocated_hours, 8.0);
    // Day dropped from the old span is recomputed, not left stale.
    assert_eq!(book.cache().get("ana", d(2025, 1, 10)).unwrap().allocated_hours, 0.0);
}

#[test]
fn delete_refreshes_cache_and_returns_removed() {
    let mut book = AllocationBook::new();
    let created = book
        .create(new("ana", d(2025, 1, 6), Some(d(2025, 1, 10)), 50.0))
        .unwrap();

    let removed = book.delete(created.allocation.id).unwrap();
    assert_eq!(removed.id, created.allocation.id);
    assert!(book.get(removed.id).is_none());
    assert_eq!(book.cache().get("ana", d(2025, 1, 7)).unwrap().allocated_hours, 0.0);
}

#[test]
fn open_ended_write_refreshes_days_already_cached() {
    let mut book = AllocationBook::new();
    book.create(new("ana", d(2025, 1, 6), Some(d(2025, 1, 10)), 50.0))
        .unwrap();
    let window = DateWindow::new(d(2025, 3, 3), d(2025, 3, 7));
    let before = book.cached_availability("ana", &window);
    assert!(before.iter().all(|record| record.allocated_hours == 0.0));
    assert_eq!(book.cache().records("ana", &window).len(), 5);

    book.create(new("ana", d(2025, 1, 6), None, 25.0)).unwrap();

    let refreshed = book.cache().get("ana", d(2025, 3, 5)).unwrap();
    assert_eq!(refreshed.allocated_hours, 2.0);
    let after = book.cached_availability("ana", &window);
    assert!(after.iter().all(|record| record.allocated_hours == 2.0));
    assert_eq!(after, book.availability("ana", &window));
}

#[test]
fn far_future_end_date_is_not_materialized() {
    let mut book = AllocationBook::new();
    let outcome = book
        .create(new("ana", d(2025, 1, 6), Some(d(9999, 12, 31)), 50.0))
        .unwrap();
    assert!(book.cache().is_empty());

    let window = DateWindow::new(d(2025, 1, 6), d(2025, 1, 10));
    assert_eq!(book.cached_availability("ana", &window).len(), 5);
    assert_eq!(book.cache().len(), 5);

    let mut edit = NewAllocation::from(&outcome.allocation);
    edit.allocation_percentage = Some(100.0);
    book.update(outcome.allocation.id, edit).unwrap();
    assert_eq!(book.cache().len(), 5);
    assert_eq!(book.cache().get("ana", d(2025, 1, 6)).unwrap().allocated_hours, 8.0);
}

#[test]
fn allocation_ending_on_the_last_representable_date() {
    let mut book = AllocationBook::new();
    book.create(new("ana", d(2025, 1, 6), Some(NaiveDate::MAX), 60.0))
        .unwrap();
    let outcome = book.create(new("ana", d(2025, 1, 6), None, 60.0)).unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].end, None);

    let tail = DateWindow::new(NaiveDate::MAX - chrono::Duration::days(13), NaiveDate::MAX);
    let summary = book.capacity("ana", &tail);
    assert_eq!(summary.working_days, 10);
    assert!((summary.allocated_hours - 96.0).abs() < 1e-9);
    assert_eq!(book.cached_availability("ana", &tail).len(), 14);
}

#[test]
fn reads_for_unknown_subjects_or_long_windows_stay_uncached() {
    let mut book = AllocationBook::new();
    book.create(new("ana", d(2025, 1, 6), None, 50.0)).unwrap();

    let century = DateWindow::new(d(2000, 1, 1), d(2099, 12, 31));
    for ghost in ["ghost0", "ghost1", "ghost2"] {
        let records = book.cached_availability(ghost, &century);
        assert_eq!(records.len() as i64, century.len_days());
    }
    let records = book.cached_availability("ana", &century);
    assert_eq!(records, book.availability("ana", &century));
    assert!(book.cache().is_empty());
}

#[test]
fn status_change_removes_hours_from_capacity() {
    let mut book = AllocationBook::new();
    let created = book
        .create(new("ana", d(2025, 1, 6), Some(d(2025, 1, 10)), 100.0))
        .unwrap();
    let window = DateWindow::new(d(2025, 1, 6), d(2025, 1, 10));
    assert_eq!(book.capacity("ana", &window).allocated_hours, 40.0);

    let outcome = book
        .set_status(created.allocation.id, AllocationStatus::Completed)
        .unwrap();
    assert_eq!(outcome.allocation.status, AllocationStatus::Completed);
    assert_eq!(book.capacity("ana", &window).allocated_hours, 0.0);
    assert_eq!(book.cache().get("ana", d(2025, 1, 6)).unwrap().allocated_hours, 0.0);
}

#[test]
fn confirm_sets_flag_only() {
    let mut book = AllocationBook::new();
    let created = book
        .create(new("ana", d(2025, 1, 6), None, 40.0))
        .unwrap();
    let outcome = book.confirm(created.allocation.id).unwrap();
    assert!(outcome.allocation.confirmed);
    assert_eq!(outcome.allocation.allocation_percentage, Some(40.0));
}

#[test]
fn missing_ids_are_not_found() {
    let mut book = AllocationBook::new();
    assert!(matches!(book.delete(42), Err(AllocationError::NotFound(42))));
    assert!(matches!(book.confirm(7), Err(AllocationError::NotFound(7))));
    assert!(matches!(
        book.set_status(7, AllocationStatus::Active),
        Err(AllocationError::NotFound(7))
    ));
    let edit = new("ana", d(2025, 1, 6), None, 10.0);
    assert!(matches!(book.update(3, edit), Err(AllocationError::NotFound(3))));
}

#[test]
fn from_allocations_continues_id_sequence() {
    let mut seed = AllocationBook::new();
    seed.create(new("ana", d(2025, 1, 6), None, 10.0)).unwrap();
    seed.create(new("ben", d(2025, 1, 6), None, 10.0)).unwrap();
    seed.delete(1).unwrap();

    let mut restored = AllocationBook::from_allocations(seed.allocations()).unwrap();
    let next = restored
        .create(new("cy", d(2025, 1, 6), None, 10.0))
        .unwrap();
    assert_eq!(next.allocation.id, 3);
}

#[test]
fn from_allocations_rejects_duplicate_ids() {
    let mut seed = AllocationBook::new();
    seed.create(new("ana", d(2025, 1, 6), None, 10.0)).unwrap();
    let mut allocations = seed.allocations();
    allocations.push(allocations[0].clone());

    let err = AllocationBook::from_allocations(allocations).unwrap_err();
    assert!(err.to_string().contains("duplicate allocation id 1"));
}

#[test]
fn report_includes_every_subject() {
    let mut book = AllocationBook::new();
    book.create(new("ana", d(2025, 2, 3), Some(d(2025, 2, 28)), 100.0))
        .unwrap();
    book.create(new("ben", d(2025, 2, 3), Some(d(2025, 2, 28)), 30.0))
        .unwrap();

    let report = book.report(&DateWindow::new(d(2025, 2, 3), d(2025, 2, 28)));
    assert_eq!(report.subjects.len(), 2);
    assert_eq!(report.subjects[0].summary.subject, "ana");
    assert_eq!(report.underutilized_count, 1);
    assert_eq!(report.on_track_count, 1);
}
