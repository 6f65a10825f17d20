use super::{PersistenceError, PersistenceResult};
use crate::allocation::{Allocation, AllocationStatus, AllocationTarget};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct AllocationSnapshot {
    #[serde(default = "default_version")]
    version: u32,
    allocations: Vec<Allocation>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

pub fn save_allocations_to_json<P: AsRef<Path>>(
    allocations: &[Allocation],
    path: P,
) -> PersistenceResult<()> {
    super::validate_allocations(allocations)?;
    let snapshot = AllocationSnapshot {
        version: SNAPSHOT_VERSION,
        allocations: allocations.to_vec(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_allocations_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Allocation>> {
    let file = File::open(path)?;
    let snapshot: AllocationSnapshot = serde_json::from_reader(file)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(PersistenceError::InvalidData(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }
    super::validate_allocations(&snapshot.allocations)?;
    Ok(snapshot.allocations)
}

#[derive(Default, Serialize, Deserialize)]
struct AllocationCsvRecord {
    id: i64,
    subject: String,
    target_kind: String,
    target_id: String,
    start_date: String,
    end_date: String,
    allocation_percentage: String,
    hours_per_day: String,
    status: String,
    billable: String,
    confirmed: String,
    #[serde(default)]
    notes: String,
}

impl From<&Allocation> for AllocationCsvRecord {
    fn from(allocation: &Allocation) -> Self {
        Self {
            id: allocation.id,
            subject: allocation.subject.clone(),
            target_kind: allocation.target.kind().to_string(),
            target_id: allocation.target.id().to_string(),
            start_date: format_date(Some(allocation.start_date)),
            end_date: format_date(allocation.end_date),
            allocation_percentage: format_option_f64(allocation.allocation_percentage),
            hours_per_day: format_option_f64(allocation.hours_per_day),
            status: allocation.status.as_str().to_string(),
            billable: allocation.billable.to_string(),
            confirmed: allocation.confirmed.to_string(),
            notes: allocation.notes.clone().unwrap_or_default(),
        }
    }
}

impl AllocationCsvRecord {
    fn into_allocation(self) -> PersistenceResult<Allocation> {
        let target = AllocationTarget::from_parts(&self.target_kind, self.target_id)
            .map_err(PersistenceError::InvalidData)?;
        let start_date = parse_date(&self.start_date)?.ok_or_else(|| {
            PersistenceError::InvalidData(format!("allocation {} has no start_date", self.id))
        })?;
        let status = if self.status.trim().is_empty() {
            AllocationStatus::default()
        } else {
            AllocationStatus::from_str(&self.status).map_err(PersistenceError::InvalidData)?
        };

        Ok(Allocation {
            id: self.id,
            subject: self.subject,
            target,
            start_date,
            end_date: parse_date(&self.end_date)?,
            allocation_percentage: parse_f64(&self.allocation_percentage)?,
            hours_per_day: parse_f64(&self.hours_per_day)?,
            status,
            billable: parse_bool(&self.billable)?.unwrap_or(false),
            confirmed: parse_bool(&self.confirmed)?.unwrap_or(false),
            notes: parse_string_option(self.notes),
        })
    }
}

pub fn save_allocations_to_csv<P: AsRef<Path>>(
    allocations: &[Allocation],
    path: P,
) -> PersistenceResult<()> {
    super::validate_allocations(allocations)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for allocation in allocations {
        writer.serialize(AllocationCsvRecord::from(allocation))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_allocations_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Allocation>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut allocations = Vec::new();
    for record in reader.deserialize::<AllocationCsvRecord>() {
        allocations.push(record?.into_allocation()?);
    }
    super::validate_allocations(&allocations)?;
    Ok(allocations)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(input: &str) -> PersistenceResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn format_option_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_f64(input: &str) -> PersistenceResult<Option<f64>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid float '{input}': {e}")))
}

fn parse_bool(input: &str) -> PersistenceResult<Option<bool>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid boolean '{other}'"
        ))),
    }
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
