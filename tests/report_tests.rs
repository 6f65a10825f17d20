use chrono::NaiveDate;
use polars::prelude::*;
use resource_capacity::report::{allocations_frame, availability_frame, render_text_table};
use resource_capacity::{
    Allocation, AllocationStatus, AllocationTarget, DateWindow, UtilizationStatus,
    daily_availability, team_utilization,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn team() -> Vec<Allocation> {
    let start = d(2025, 2, 3);
    let end = d(2025, 2, 28);
    vec![
        Allocation::new(1, "ana", AllocationTarget::Project("a".into()), start, Some(end))
            .with_percentage(80.0),
        Allocation::new(2, "ana", AllocationTarget::Task("b".into()), start, Some(end))
            .with_percentage(40.0),
        Allocation::new(3, "ben", AllocationTarget::Project("a".into()), start, None)
            .with_percentage(75.0),
        Allocation::new(4, "cy", AllocationTarget::Phase("c".into()), start, Some(end))
            .with_percentage(20.0),
        Allocation::new(5, "cy", AllocationTarget::Phase("d".into()), start, Some(end))
            .with_status(AllocationStatus::Completed),
    ]
}

#[test]
fn subjects_are_classified() {
    let window = DateWindow::new(d(2025, 2, 1), d(2025, 2, 28));
    let report = team_utilization(&window, &[], &team());

    assert_eq!(report.subjects.len(), 3);
    assert_eq!(report.find("ana").unwrap().status, UtilizationStatus::Overallocated);
    assert_eq!(report.find("ben").unwrap().status, UtilizationStatus::OnTrack);
    let cy = report.find("cy").unwrap();
    assert_eq!(cy.status, UtilizationStatus::Underutilized);
    assert_eq!(cy.allocation_count, 1);

    assert_eq!(report.overallocated_count, 1);
    assert_eq!(report.on_track_count, 1);
    assert_eq!(report.underutilized_count, 1);
    assert_eq!(report.total_available_hours, 480.0);
    assert!((report.overall_utilization_percentage - 215.0 / 3.0).abs() < 1e-9);
}

#[test]
fn roster_members_without_allocations_appear_idle() {
    let window = DateWindow::new(d(2025, 2, 1), d(2025, 2, 28));
    let roster = vec!["dee".to_string()];
    let report = team_utilization(&window, &roster, &team());

    let dee = report.find("dee").unwrap();
    assert_eq!(dee.summary.allocated_hours, 0.0);
    assert_eq!(dee.status, UtilizationStatus::Underutilized);
    let names: Vec<&str> = report
        .subjects
        .iter()
        .map(|entry| entry.summary.subject.as_str())
        .collect();
    assert_eq!(names, vec!["ana", "ben", "cy", "dee"]);
}

#[test]
fn report_frame_has_one_row_per_subject() {
    let window = DateWindow::new(d(2025, 2, 1), d(2025, 2, 28));
    let df = team_utilization(&window, &[], &team()).to_dataframe().unwrap();

    assert_eq!(df.height(), 3);
    let status = df.column("status").unwrap().str().unwrap();
    assert_eq!(status.get(0), Some("overallocated"));
    let utilization = df.column("utilization_pct").unwrap().f64().unwrap();
    assert_eq!(utilization.get(0), Some(120.0));
}

#[test]
fn availability_frame_uses_date_column() {
    let records = daily_availability("ana", d(2025, 2, 7), d(2025, 2, 10), &team());
    let df = availability_frame(&records).unwrap();

    assert_eq!(df.height(), 4);
    assert_eq!(df.get_column_names()[0].as_str(), "date");
    assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    let allocated = df.column("allocated_hours").unwrap().f64().unwrap();
    assert_eq!(allocated.get(0), Some(9.6));
    assert_eq!(allocated.get(1), Some(0.0));
}

#[test]
fn allocation_table_renders_open_end() {
    let df = allocations_frame(&team()).unwrap();
    let table = render_text_table(&df);

    assert!(table.starts_with("+"));
    assert!(table.contains("| id "));
    assert!(table.contains("project:a"));
    assert!(table.contains("open"));
    assert_eq!(table.lines().count(), 5 + 4);
}
