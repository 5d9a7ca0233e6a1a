//! Visit Log Store
//!
//! A bounded, append-only log of visits plus two all-time counters: the
//! total number of views and the set of addresses ever seen.
//!
//! # Architecture
//!
//! ```text
//! Write Path (one atomic unit):
//! ┌─────────┐    ┌──────────────┐    ┌─────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ingest  │───►│ push newest  │───►│ totalViews  │───►│ register ip  │───►│ trim oldest  │
//! │ request │    │ record       │    │ += 1        │    │ in seen set  │    │ > max_visits │
//! └─────────┘    └──────────────┘    └─────────────┘    └──────────────┘    └──────────────┘
//!
//! Read Path:
//! ┌──────────────┐    ┌──────────────────┐
//! │ snapshot()   │───►│ StatsAggregator  │───► StatsPage
//! └──────────────┘    └──────────────────┘
//! ```
//!
//! Two backends implement [`VisitStore`]: [`FileStore`] keeps a single JSON
//! document, [`SqliteStore`] keeps tables in an embedded database. The
//! backend is picked by [`StoreConfig::backend`].

mod file;
mod migrations;
mod sqlite;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::types::VisitRecord;
use crate::utils::AtomicError;

pub use file::FileStore;
pub use sqlite::SqliteStore;

/// Default retention cap of the flat-file backend
pub const DEFAULT_FILE_MAX_VISITS: usize = 500;
/// Default retention cap of the table-backed backend
pub const DEFAULT_SQLITE_MAX_VISITS: usize = 100;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Store corrupted: {0}")]
    Corrupted(String),
    #[error("Store schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i32, supported: i32 },
    #[error("Store is closed")]
    Closed,
}

impl From<AtomicError> for StoreError {
    fn from(e: AtomicError) -> Self {
        match e {
            AtomicError::Io(e) => StoreError::Io(e),
            other => StoreError::Corrupted(other.to_string()),
        }
    }
}

/// Persistence backend for the visit log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Single JSON document rewritten atomically
    File,
    /// Embedded SQLite database
    Sqlite,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::File => "file",
            Backend::Sqlite => "sqlite",
        }
    }

    /// Retention cap used when none is configured
    pub fn default_max_visits(&self) -> usize {
        match self {
            Backend::File => DEFAULT_FILE_MAX_VISITS,
            Backend::Sqlite => DEFAULT_SQLITE_MAX_VISITS,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Backend::File),
            "sqlite" | "db" | "table" => Ok(Backend::Sqlite),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Configuration for opening a store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: Backend,
    /// Directory holding the store's files
    pub data_dir: PathBuf,
    /// Retention cap of the visit log
    pub max_visits: usize,
}

impl StoreConfig {
    /// Config for `backend` rooted at `data_dir` with the backend's default cap
    pub fn new<P: AsRef<Path>>(backend: Backend, data_dir: P) -> Self {
        Self {
            backend,
            data_dir: data_dir.as_ref().to_path_buf(),
            max_visits: backend.default_max_visits(),
        }
    }

    /// Override the retention cap (values below 1 are raised to 1)
    pub fn with_max_visits(mut self, max_visits: usize) -> Self {
        self.max_visits = max_visits.max(1);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the flat-file document
    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join("visits.json")
    }

    /// Path to the SQLite database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("visits.db")
    }
}

/// Consistent view of the store at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub total_views: u64,
    pub unique_visitors: u64,
    /// Retained log, oldest first
    pub visits: Vec<VisitRecord>,
}

/// Storage interface shared by both backends
///
/// Implementations serialize appends and apply the four append effects
/// (insert, count, register address, trim) all-or-nothing.
pub trait VisitStore: Send + Sync {
    /// Append one visit as a single atomic unit of work
    fn append(&self, record: VisitRecord) -> StoreResult<()>;

    /// Read counters and the retained log together
    fn snapshot(&self) -> StoreResult<StoreSnapshot>;

    /// Release the backing resources; later calls fail with [`StoreError::Closed`]
    fn close(&self) -> StoreResult<()>;

    fn max_visits(&self) -> usize;

    fn backend(&self) -> Backend;
}

/// Open (or create) the store selected by `config`
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn VisitStore>> {
    let store: Arc<dyn VisitStore> = match config.backend {
        Backend::File => Arc::new(FileStore::open(config)?),
        Backend::Sqlite => Arc::new(SqliteStore::open(config)?),
    };

    info!(
        backend = %config.backend,
        data_dir = %config.data_dir.display(),
        max_visits = config.max_visits,
        "Visit store opened"
    );

    Ok(store)
}
