use chrono::NaiveDate;
use resource_capacity::{
    Allocation, AllocationStatus, AllocationTarget, PersistenceError, load_allocations_from_csv,
    load_allocations_from_json, save_allocations_to_csv, save_allocations_to_json,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_allocations() -> Vec<Allocation> {
    let mut design = Allocation::new(
        1,
        "ana",
        AllocationTarget::Project("apollo".into()),
        d(2025, 1, 6),
        Some(d(2025, 1, 31)),
    )
    .with_percentage(60.0)
    .with_hours_per_day(7.5);
    design.notes = Some("Design sprint, phase one".into());
    design.confirmed = true;

    let mut support = Allocation::new(
        4,
        "ben",
        AllocationTarget::Phase("rollout".into()),
        d(2025, 2, 3),
        None,
    )
    .with_percentage(25.0)
    .with_status(AllocationStatus::Planned);
    support.billable = false;

    let review = Allocation::new(
        7,
        "ana",
        AllocationTarget::Task("t-12".into()),
        d(2025, 1, 20),
        Some(d(2025, 1, 24)),
    )
    .with_status(AllocationStatus::Cancelled);

    vec![design, support, review]
}

#[test]
fn json_snapshot_preserves_allocations() {
    let allocations = sample_allocations();
    let file = NamedTempFile::new().unwrap();

    save_allocations_to_json(&allocations, file.path()).unwrap();
    let loaded = load_allocations_from_json(file.path()).unwrap();

    assert_eq!(loaded, allocations);
}

#[test]
fn csv_export_preserves_allocations() {
    let allocations = sample_allocations();
    let file = NamedTempFile::new().unwrap();

    save_allocations_to_csv(&allocations, file.path()).unwrap();
    let loaded = load_allocations_from_csv(file.path()).unwrap();

    assert_eq!(loaded, allocations);
}

#[test]
fn csv_header_names_columns() {
    let file = NamedTempFile::new().unwrap();
    save_allocations_to_csv(&sample_allocations(), file.path()).unwrap();

    let contents = std::fs::read_to_string(file.path()).unwrap();
    let header = contents.lines().next().unwrap();
    assert!(header.starts_with("id,subject,target_kind,target_id,start_date,end_date"));
    assert!(contents.contains("phase,rollout,2025-02-03,,25"));
}

#[test]
fn csv_blank_cells_become_missing_values() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "id,subject,target_kind,target_id,start_date,end_date,allocation_percentage,hours_per_day,status,billable,confirmed,notes"
    )
    .unwrap();
    writeln!(file, "3,cy,task,t-1,2025-03-03,,,,,,,").unwrap();
    file.flush().unwrap();

    let loaded = load_allocations_from_csv(file.path()).unwrap();

    assert_eq!(loaded.len(), 1);
    let allocation = &loaded[0];
    assert_eq!(allocation.end_date, None);
    assert_eq!(allocation.allocation_percentage, None);
    assert_eq!(allocation.hours_per_day, None);
    assert_eq!(allocation.status, AllocationStatus::Planned);
    assert!(!allocation.billable);
    assert_eq!(allocation.notes, None);
    assert_eq!(allocation.daily_hours(), 0.0);
}

#[test]
fn unknown_target_kind_is_invalid_data() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "id,subject,target_kind,target_id,start_date,end_date,allocation_percentage,hours_per_day,status,billable,confirmed,notes"
    )
    .unwrap();
    writeln!(file, "3,cy,epic,e-1,2025-03-03,,50,8,active,true,false,").unwrap();
    file.flush().unwrap();

    let err = load_allocations_from_csv(file.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn duplicate_ids_are_refused_on_save() {
    let mut allocations = sample_allocations();
    allocations.push(allocations[0].clone());
    let file = NamedTempFile::new().unwrap();

    let err = save_allocations_to_json(&allocations, file.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn newer_snapshot_version_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"version": 99, "allocations": []}}"#).unwrap();
    file.flush().unwrap();

    let err = load_allocations_from_json(file.path()).unwrap_err();
    assert!(err.to_string().contains("unsupported snapshot version 99"));
}

#[test]
fn snapshot_without_version_loads() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"allocations": [{{"id": 2, "subject": "dee", "target": {{"kind": "project", "id": "x"}}, "start_date": "2025-01-06", "allocation_percentage": 50.0, "hours_per_day": 8.0}}]}}"#
    )
    .unwrap();
    file.flush().unwrap();

    let loaded = load_allocations_from_json(file.path()).unwrap();
    assert_eq!(loaded[0].status, AllocationStatus::Planned);
    assert_eq!(loaded[0].daily_hours(), 4.0);
}
