//! Batched archival, restoration and bounded cleanup of old expense records.
//!
//! Records older than the retention cutoff are migrated from the live
//! `expense` table into `expense_archive` in fixed-size batches, then the
//! migrated originals are deleted in one bulk operation. The whole
//! migrate-then-delete run executes inside a single SQL transaction: a
//! failed batch rolls everything back instead of leaving records duplicated
//! across the two stores. Archive inserts ignore IDs that are already
//! archived, so re-running archival after an earlier run is idempotent.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use rusqlite::{Connection, Row, params};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, monitor::QueryMonitor};

/// Moves expense records between the live store and the archive store.
///
/// The store handle is passed in at construction; the manager never owns
/// process-wide state.
#[derive(Debug, Clone)]
pub struct ArchiveManager {
    connection: Arc<Mutex<Connection>>,
    monitor: QueryMonitor,
}

/// The outcome of one archival run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveRunResult {
    /// How many records were newly written to the archive store.
    pub archived_count: usize,
    /// How many live records were deleted after migration.
    pub deleted_count: usize,
    /// The retention cutoff the run used; records created before it
    /// qualified for archival.
    #[serde(with = "time::serde::rfc3339")]
    pub cutoff: OffsetDateTime,
}

/// Aggregate statistics over the archive store.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ArchiveStats {
    /// The number of archived records.
    pub total_records: u64,
    /// The earliest `created_at` among archived records.
    #[serde(with = "time::serde::rfc3339::option")]
    pub oldest: Option<OffsetDateTime>,
    /// The latest `created_at` among archived records.
    #[serde(with = "time::serde::rfc3339::option")]
    pub newest: Option<OffsetDateTime>,
    /// A rough estimate of the archive's on-disk size in bytes.
    pub size_estimate_bytes: u64,
}

/// A live row carried into the archive verbatim; amounts stay as stored
/// text, nothing is re-parsed on the way through.
struct RawExpenseRow {
    id: i64,
    category: String,
    amount: String,
    month: i64,
    year: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl RawExpenseRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            amount: row.get(2)?,
            month: row.get(3)?,
            year: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl ArchiveManager {
    /// Create an archive manager over the given store handle.
    pub fn new(connection: Arc<Mutex<Connection>>, monitor: QueryMonitor) -> Self {
        Self {
            connection,
            monitor,
        }
    }

    /// Migrate live records older than `now - retention_years` into the
    /// archive store, then delete the originals.
    ///
    /// Records are read in `batch_size` chunks ordered by `created_at` (a
    /// zero `batch_size` is treated as one); each
    /// is inserted with an ignore-if-already-archived conflict policy, and
    /// the bulk delete runs only after every batch has been migrated. The
    /// run is wrapped in one transaction, so a mid-run failure leaves both
    /// stores untouched.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if any step of the migration fails, or
    /// [Error::DatabaseLockError] if the store handle cannot be locked.
    pub fn archive_old_data(
        &self,
        retention_years: u32,
        batch_size: usize,
    ) -> Result<ArchiveRunResult, Error> {
        let started = Instant::now();
        let cutoff = years_before(OffsetDateTime::now_utc(), retention_years);
        // LIMIT 0 would skip the migration loop while the delete still ran.
        let batch_size = batch_size.max(1);

        let mut connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        let tx = connection.transaction()?;

        let qualifying: i64 = tx.query_row(
            "SELECT COUNT(*) FROM expense WHERE created_at < ?1",
            params![cutoff],
            |row| row.get(0),
        )?;

        if qualifying == 0 {
            tracing::info!("no records older than {cutoff} to archive");
            return Ok(ArchiveRunResult {
                archived_count: 0,
                deleted_count: 0,
                cutoff,
            });
        }

        let archived_at = OffsetDateTime::now_utc();
        let mut archived_count = 0;
        let mut offset = 0;

        {
            let mut select = tx.prepare(
                "SELECT id, category, amount, month, year, created_at, updated_at FROM expense \
                WHERE created_at < ?1 ORDER BY created_at ASC LIMIT ?2 OFFSET ?3",
            )?;
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO expense_archive \
                (id, category, amount, month, year, created_at, updated_at, archived_at) \
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            loop {
                let batch: Vec<RawExpenseRow> = select
                    .query_map(
                        params![cutoff, batch_size as i64, offset as i64],
                        RawExpenseRow::from_row,
                    )?
                    .collect::<Result<_, _>>()?;

                if batch.is_empty() {
                    break;
                }

                let fetched = batch.len();
                for row in batch {
                    archived_count += insert.execute(params![
                        row.id,
                        row.category,
                        row.amount,
                        row.month,
                        row.year,
                        row.created_at,
                        row.updated_at,
                        archived_at,
                    ])?;
                }

                offset += fetched;
                if fetched < batch_size {
                    break;
                }
            }
        }

        // The delete depends on every batch above having been migrated; it is
        // deliberately not scoped per batch.
        let deleted_count = tx.execute(
            "DELETE FROM expense WHERE created_at < ?1",
            params![cutoff],
        )?;
        tx.commit()?;

        self.monitor
            .record_query("archive_old_data", started.elapsed());
        tracing::info!(
            "archived {archived_count} records and deleted {deleted_count} live records \
            older than {cutoff}"
        );

        Ok(ArchiveRunResult {
            archived_count,
            deleted_count,
            cutoff,
        })
    }

    /// Copy archived records with `created_at` in `[start, end]` back into
    /// the live store, returning the number of records restored.
    ///
    /// Restoration upserts: a live record with the same ID gets its amount
    /// and `updated_at` overwritten. The archive copies are kept.
    ///
    /// # Errors
    /// Returns [Error::InvalidRange] when `end < start`,
    /// [Error::DuplicatePeriod] when a restored record collides with a
    /// different live record for the same category and period, or
    /// [Error::SqlError] if the upsert fails for any other reason.
    pub fn restore_from_archive(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<usize, Error> {
        if end < start {
            return Err(Error::InvalidRange(format!(
                "restore end date {end} is before start date {start}"
            )));
        }

        let started = Instant::now();
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let restored = connection.execute(
            "INSERT INTO expense (id, category, amount, month, year, created_at, updated_at) \
            SELECT id, category, amount, month, year, created_at, ?1 FROM expense_archive \
            WHERE created_at BETWEEN ?2 AND ?3 \
            ON CONFLICT(id) DO UPDATE SET amount = excluded.amount, updated_at = excluded.updated_at",
            params![OffsetDateTime::now_utc(), start, end],
        )?;

        self.monitor
            .record_query("restore_from_archive", started.elapsed());
        tracing::info!("restored {restored} records created between {start} and {end}");

        Ok(restored)
    }

    /// Delete archived records with `created_at` older than
    /// `now - max_archive_years`, returning the number deleted.
    ///
    /// This is irreversible.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the delete fails.
    pub fn cleanup_old_archives(&self, max_archive_years: u32) -> Result<usize, Error> {
        let started = Instant::now();
        let cutoff = years_before(OffsetDateTime::now_utc(), max_archive_years);

        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let deleted = connection.execute(
            "DELETE FROM expense_archive WHERE created_at < ?1",
            params![cutoff],
        )?;

        self.monitor
            .record_query("cleanup_old_archives", started.elapsed());
        tracing::info!("cleaned up {deleted} archived records older than {cutoff}");

        Ok(deleted)
    }

    /// Aggregate statistics over the archive store.
    ///
    /// Returns zeroed stats when the archive table has never been created or
    /// holds no records; a missing table is not an error.
    pub fn archive_stats(&self) -> Result<ArchiveStats, Error> {
        let started = Instant::now();
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let table_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM sqlite_master \
            WHERE type = 'table' AND name = 'expense_archive'",
            [],
            |row| row.get(0),
        )?;

        if table_count == 0 {
            return Ok(ArchiveStats::default());
        }

        let stats = connection.query_row(
            "SELECT COUNT(*), MIN(created_at), MAX(created_at), \
            IFNULL(SUM(LENGTH(category) + LENGTH(amount) + LENGTH(created_at) \
            + LENGTH(updated_at) + LENGTH(archived_at) + 24), 0) \
            FROM expense_archive",
            [],
            |row| {
                // SQLite aggregates come back as i64; neither can be negative.
                Ok(ArchiveStats {
                    total_records: row.get::<_, i64>(0)?.try_into().unwrap_or(0),
                    oldest: row.get(1)?,
                    newest: row.get(2)?,
                    size_estimate_bytes: row.get::<_, i64>(3)?.try_into().unwrap_or(0),
                })
            },
        )?;

        self.monitor.record_query("archive_stats", started.elapsed());

        Ok(stats)
    }
}

/// `now` shifted back by a whole number of years.
fn years_before(now: OffsetDateTime, years: u32) -> OffsetDateTime {
    let target_year = now.year() - years as i32;
    match now.replace_year(target_year) {
        Ok(cutoff) => cutoff,
        // Feb 29 with a non-leap target year; clamp to the 28th.
        Err(_) => now
            .replace_day(28)
            .expect("day 28 exists in every month")
            .replace_year(target_year)
            .expect("year arithmetic cannot fail on day 28"),
    }
}
