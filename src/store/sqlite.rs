//! Table-backed backend
//!
//! Visits, seen addresses and the view counter live in three SQLite tables.
//! An append runs its four statements inside one transaction; dropping the
//! transaction on any error rolls all of them back.

use std::convert::TryFrom;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use tracing::{debug, error, info, warn};

use crate::types::VisitRecord;
use crate::utils::{format_timestamp, parse_timestamp};

use super::migrations::run_migrations;
use super::{Backend, StoreConfig, StoreError, StoreResult, StoreSnapshot, VisitStore};

const TOTAL_VIEWS: &str = "total_views";

fn to_i64(value: usize) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::Corrupted(format!("value {} exceeds SQLite INTEGER range", value)))
}

fn to_u64(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::Corrupted(format!("value {} is negative", value)))
}

fn row_to_visit(row: &Row) -> StoreResult<VisitRecord> {
    let visited_at: String = row.get(0)?;
    let timestamp = parse_timestamp(&visited_at)
        .map_err(|e| StoreError::Corrupted(format!("invalid visited_at '{}': {}", visited_at, e)))?;

    Ok(VisitRecord {
        timestamp,
        source_address: row.get(1)?,
        user_agent: row.get(2)?,
        referrer: row.get(3)?,
        device_class: row.get(4)?,
        screen: row.get(5)?,
        language: row.get(6)?,
    })
}

/// Visit store backed by an embedded SQLite database
pub struct SqliteStore {
    path: PathBuf,
    max_visits: usize,
    /// `None` once the store has been closed
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open the database at `config.db_path()`, creating and migrating it
    /// as needed
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let path = config.db_path();
        fs::create_dir_all(config.data_dir())?;

        let mut conn = Connection::open(&path)?;
        if let Err(err) =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        {
            warn!(error = %err, "Failed to enable WAL mode");
        }

        run_migrations(&mut conn)?;

        let store = Self {
            path,
            max_visits: config.max_visits.max(1),
            conn: Mutex::new(Some(conn)),
        };
        store.trim_to_cap()?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Applies a lowered retention cap to an existing database.
    fn trim_to_cap(&self) -> StoreResult<()> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;

        let trimmed = conn.execute(
            "DELETE FROM visits WHERE id NOT IN (SELECT id FROM visits ORDER BY id DESC LIMIT ?1)",
            params![to_i64(self.max_visits)?],
        )?;
        if trimmed > 0 {
            info!(trimmed, max_visits = self.max_visits, "Trimmed visit log to retention cap");
        }
        Ok(())
    }

    fn append_in_transaction(
        conn: &mut Connection,
        record: &VisitRecord,
        max_visits: i64,
    ) -> StoreResult<usize> {
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO visits (visited_at, source_address, user_agent, referrer, device_class, screen, language)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                format_timestamp(&record.timestamp),
                record.source_address,
                record.user_agent,
                record.referrer,
                record.device_class,
                record.screen,
                record.language,
            ],
        )?;

        tx.execute(
            "UPDATE counters SET value = value + 1 WHERE name = ?1",
            params![TOTAL_VIEWS],
        )?;

        tx.execute(
            "INSERT OR IGNORE INTO seen_addresses (address) VALUES (?1)",
            params![record.source_address],
        )?;

        let trimmed = tx.execute(
            "DELETE FROM visits WHERE id NOT IN (SELECT id FROM visits ORDER BY id DESC LIMIT ?1)",
            params![max_visits],
        )?;

        tx.commit()?;
        Ok(trimmed)
    }

    fn read_snapshot(conn: &Connection) -> StoreResult<StoreSnapshot> {
        let total_views: i64 = conn.query_row(
            "SELECT value FROM counters WHERE name = ?1",
            params![TOTAL_VIEWS],
            |row| row.get(0),
        )?;
        let unique_visitors: i64 =
            conn.query_row("SELECT COUNT(*) FROM seen_addresses", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT visited_at, source_address, user_agent, referrer, device_class, screen, language
             FROM visits
             ORDER BY id ASC",
        )?;
        let mut rows = stmt.query([])?;
        let mut visits = Vec::new();
        while let Some(row) = rows.next()? {
            visits.push(row_to_visit(row)?);
        }

        Ok(StoreSnapshot {
            total_views: to_u64(total_views)?,
            unique_visitors: to_u64(unique_visitors)?,
            visits,
        })
    }
}

impl VisitStore for SqliteStore {
    fn append(&self, record: VisitRecord) -> StoreResult<()> {
        let max_visits = to_i64(self.max_visits)?;
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;

        match Self::append_in_transaction(conn, &record, max_visits) {
            Ok(trimmed) => {
                debug!(trimmed, "Visit appended");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "Visit append rejected");
                Err(e)
            }
        }
    }

    fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        Self::read_snapshot(conn)
    }

    fn close(&self) -> StoreResult<()> {
        let Some(conn) = self.conn.lock().take() else {
            return Ok(());
        };

        conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;
        info!(path = %self.path.display(), "SQLite store closed");
        Ok(())
    }

    fn max_visits(&self) -> usize {
        self.max_visits
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }
}
