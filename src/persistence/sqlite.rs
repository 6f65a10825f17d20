use super::{AllocationStore, PersistenceError, PersistenceResult};
use crate::allocation::{Allocation, AllocationId, AllocationStatus, NewAllocation};
use crate::allocation_validation;
use crate::book::WriteOutcome;
use crate::cache::MATERIALIZE_HORIZON_DAYS;
use crate::capacity::{self, DailyCapacity};
use crate::conflict;
use crate::error::AllocationError;
use crate::window::DateWindow;
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub struct SqliteAllocationStore {
    connection: Mutex<Connection>,
}

impl SqliteAllocationStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS allocations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL,
                allocation_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS allocations_subject ON allocations (subject);
            CREATE TABLE IF NOT EXISTS capacity_cache (
                subject TEXT NOT NULL,
                day_number INTEGER NOT NULL,
                available_hours REAL NOT NULL,
                allocated_hours REAL NOT NULL,
                remaining_hours REAL NOT NULL,
                is_working_day INTEGER NOT NULL,
                is_overallocated INTEGER NOT NULL,
                PRIMARY KEY (subject, day_number)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Number of capacity rows currently cached for `subject`.
    pub fn cached_row_count(&self, subject: &str) -> PersistenceResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM capacity_cache WHERE subject = ?1",
            params![subject],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".into()))
    }

    fn find_allocation(tx: &Transaction, id: AllocationId) -> PersistenceResult<Option<Allocation>> {
        let json: Option<String> = tx
            .query_row(
                "SELECT allocation_json FROM allocations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|json| serde_json::from_str(&json).map_err(PersistenceError::from))
            .transpose()
    }

    fn subject_allocations(conn: &Connection, subject: &str) -> PersistenceResult<Vec<Allocation>> {
        let mut stmt =
            conn.prepare("SELECT allocation_json FROM allocations WHERE subject = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![subject], |row| row.get::<_, String>(0))?;
        let mut allocations = Vec::new();
        for json in rows {
            allocations.push(serde_json::from_str(&json?)?);
        }
        Ok(allocations)
    }

    fn write_allocation(tx: &Transaction, allocation: &Allocation) -> PersistenceResult<()> {
        let json = serde_json::to_string(allocation)?;
        tx.execute(
            "UPDATE allocations SET subject = ?1, allocation_json = ?2 WHERE id = ?3",
            params![allocation.subject, json, allocation.id],
        )?;
        Ok(())
    }

    /// Recompute cache rows for the span `allocation` covers.
    fn recompute_span(tx: &Transaction, allocation: &Allocation) -> PersistenceResult<()> {
        Self::recompute_dates(
            tx,
            &allocation.subject,
            allocation.start_date,
            allocation.end_date,
        )
    }

    /// Spans within the horizon are rewritten in full; open-ended and longer
    /// spans only refresh rows that are already cached.
    fn recompute_dates(
        tx: &Transaction,
        subject: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> PersistenceResult<()> {
        let allocations = Self::subject_allocations(tx, subject)?;
        let window = DateWindow::new(start, end.unwrap_or(NaiveDate::MAX));
        let dates: Vec<NaiveDate> = if window.len_days() <= MATERIALIZE_HORIZON_DAYS {
            window.days().collect()
        } else {
            let mut stmt = tx.prepare(
                "SELECT day_number FROM capacity_cache
                 WHERE subject = ?1 AND day_number >= ?2 AND day_number <= ?3 ORDER BY day_number",
            )?;
            let rows = stmt.query_map(
                params![subject, day_number(window.start), day_number(window.end)],
                |row| row.get::<_, i32>(0),
            )?;
            let mut dates = Vec::new();
            for row in rows {
                dates.push(from_day_number(row?)?);
            }
            dates
        };

        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO capacity_cache
                (subject, day_number, available_hours, allocated_hours, remaining_hours, is_working_day, is_overallocated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for date in &dates {
            for record in capacity::daily_availability(subject, *date, *date, &allocations) {
                stmt.execute(params![
                    record.subject,
                    day_number(record.date),
                    record.available_hours,
                    record.allocated_hours,
                    record.remaining_hours,
                    record.is_working_day,
                    record.is_overallocated,
                ])?;
            }
        }
        debug!(subject, rows = dates.len(), "capacity cache recomputed");
        Ok(())
    }

    fn outcome(tx: &Transaction, allocation: Allocation) -> PersistenceResult<WriteOutcome> {
        let allocations = Self::subject_allocations(tx, &allocation.subject)?;
        let warnings = conflict::check_conflicts(&allocation, &allocations);
        for warning in &warnings {
            warn!(id = allocation.id, %warning, "subject overallocated");
        }
        Ok(WriteOutcome {
            allocation,
            warnings,
        })
    }

    /// Swap the stored allocation `id` for `modify(previous)` and refresh both spans.
    fn replace<F>(&self, id: AllocationId, modify: F) -> PersistenceResult<WriteOutcome>
    where
        F: FnOnce(Allocation) -> Allocation,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let previous =
            Self::find_allocation(&tx, id)?.ok_or(AllocationError::NotFound(id))?;
        let allocation = modify(previous.clone());
        allocation_validation::validate_allocation(&allocation)?;
        Self::write_allocation(&tx, &allocation)?;
        Self::recompute_span(&tx, &previous)?;
        Self::recompute_span(&tx, &allocation)?;
        let outcome = Self::outcome(&tx, allocation)?;
        tx.commit()?;
        info!(id, status = %outcome.allocation.status, "allocation updated");
        Ok(outcome)
    }

    /// Cache rows currently stored for `subject` inside `window`.
    fn read_cache(
        conn: &Connection,
        subject: &str,
        window: &DateWindow,
    ) -> PersistenceResult<Vec<DailyCapacity>> {
        let mut stmt = conn.prepare(
            "SELECT day_number, available_hours, allocated_hours, remaining_hours, is_working_day, is_overallocated
             FROM capacity_cache
             WHERE subject = ?1 AND day_number >= ?2 AND day_number <= ?3 ORDER BY day_number",
        )?;
        let rows = stmt.query_map(
            params![subject, day_number(window.start), day_number(window.end)],
            |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, bool>(5)?,
                ))
            },
        )?;
        let mut records = Vec::new();
        for row in rows {
            let (date, available, allocated, remaining, working, over) = row?;
            records.push(DailyCapacity {
                subject: subject.to_string(),
                date: from_day_number(date)?,
                available_hours: available,
                allocated_hours: allocated,
                remaining_hours: remaining,
                is_working_day: working,
                is_overallocated: over,
            });
        }
        Ok(records)
    }
}

impl AllocationStore for SqliteAllocationStore {
    fn create_allocation(&self, new: NewAllocation) -> PersistenceResult<WriteOutcome> {
        allocation_validation::validate_allocation(&new.clone().into_allocation(0))?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO allocations (subject, allocation_json) VALUES (?1, '{}')",
            params![new.subject],
        )?;
        let allocation = new.into_allocation(tx.last_insert_rowid());
        Self::write_allocation(&tx, &allocation)?;
        Self::recompute_span(&tx, &allocation)?;
        let outcome = Self::outcome(&tx, allocation)?;
        tx.commit()?;
        info!(id = outcome.allocation.id, subject = %outcome.allocation.subject, "allocation stored");
        Ok(outcome)
    }

    fn update_allocation(
        &self,
        id: AllocationId,
        edit: NewAllocation,
    ) -> PersistenceResult<WriteOutcome> {
        let allocation = edit.into_allocation(id);
        self.replace(id, |_| allocation)
    }

    fn set_status(
        &self,
        id: AllocationId,
        status: AllocationStatus,
    ) -> PersistenceResult<WriteOutcome> {
        self.replace(id, |mut allocation| {
            allocation.status = status;
            allocation
        })
    }

    fn confirm(&self, id: AllocationId) -> PersistenceResult<WriteOutcome> {
        self.replace(id, |mut allocation| {
            allocation.confirmed = true;
            allocation
        })
    }

    fn delete_allocation(&self, id: AllocationId) -> PersistenceResult<Allocation> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = Self::find_allocation(&tx, id)?.ok_or(AllocationError::NotFound(id))?;
        tx.execute("DELETE FROM allocations WHERE id = ?1", params![id])?;
        Self::recompute_span(&tx, &removed)?;
        tx.commit()?;
        info!(id, subject = %removed.subject, "allocation deleted");
        Ok(removed)
    }

    fn load_allocations(&self) -> PersistenceResult<Vec<Allocation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT allocation_json FROM allocations ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut allocations = Vec::new();
        for json in rows {
            let json = json?;
            let allocation: Allocation = serde_json::from_str(&json)?;
            allocations.push(allocation);
        }

        super::validate_allocations(&allocations)?;
        Ok(allocations)
    }

    fn load_subject_allocations(&self, subject: &str) -> PersistenceResult<Vec<Allocation>> {
        let conn = self.lock()?;
        Self::subject_allocations(&conn, subject)
    }

    /// Serve cached rows, materializing any missing days of `window` first.
    /// Long windows and subjects with nothing booked are computed without
    /// touching the cache.
    fn cached_capacity(
        &self,
        subject: &str,
        window: &DateWindow,
    ) -> PersistenceResult<Vec<DailyCapacity>> {
        if window.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.lock()?;
        let allocations = Self::subject_allocations(&conn, subject)?;
        if window.len_days() > MATERIALIZE_HORIZON_DAYS
            || !allocations.iter().any(Allocation::counts_toward_capacity)
        {
            return Ok(capacity::daily_availability(
                subject,
                window.start,
                window.end,
                &allocations,
            ));
        }
        let cached = Self::read_cache(&conn, subject, window)?;
        if cached.len() as i64 == window.len_days() {
            return Ok(cached);
        }

        let tx = conn.transaction()?;
        Self::recompute_dates(&tx, subject, window.start, Some(window.end))?;
        let records = Self::read_cache(&tx, subject, window)?;
        tx.commit()?;
        Ok(records)
    }
}

/// Days since 0001-01-01, which orders correctly for every representable year.
fn day_number(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

fn from_day_number(value: i32) -> PersistenceResult<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(value)
        .ok_or_else(|| PersistenceError::InvalidData(format!("invalid cached day number {value}")))
}
