//! Flat-file backend
//!
//! The whole store is one JSON document:
//!
//! ```text
//! { "totalViews": 42, "seenAddresses": ["10.0.0.1", ...], "visits": [ {..oldest..}, ..., {..newest..} ] }
//! ```
//!
//! Appends hold the write lock, build the next document on a copy, persist
//! it with [`atomic_write`] and only then publish it in memory. A failed
//! write leaves both the file and the in-memory state untouched.

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::types::VisitRecord;
use crate::utils::{atomic_write, cleanup_temp_files};

use super::{Backend, StoreConfig, StoreError, StoreResult, StoreSnapshot, VisitStore};

/// Persisted document of the flat-file backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileState {
    #[serde(default)]
    total_views: u64,
    #[serde(default)]
    seen_addresses: BTreeSet<String>,
    #[serde(default)]
    visits: VecDeque<VisitRecord>,
}

impl FileState {
    /// Upgrade the historical format, a bare array of visits
    ///
    /// Only the retained visits are known, so the counters start from them.
    fn from_legacy(visits: Vec<VisitRecord>) -> Self {
        let seen_addresses = visits.iter().map(|v| v.source_address.clone()).collect();
        Self {
            total_views: visits.len() as u64,
            seen_addresses,
            visits: visits.into(),
        }
    }

    fn apply_append(&mut self, record: VisitRecord, max_visits: usize) {
        self.seen_addresses.insert(record.source_address.clone());
        self.visits.push_back(record);
        self.total_views += 1;
        self.trim(max_visits);
    }

    fn trim(&mut self, max_visits: usize) -> usize {
        let excess = self.visits.len().saturating_sub(max_visits);
        self.visits.drain(..excess);
        excess
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            total_views: self.total_views,
            unique_visitors: self.seen_addresses.len() as u64,
            visits: self.visits.iter().cloned().collect(),
        }
    }
}

/// Visit store backed by a single JSON file
pub struct FileStore {
    path: PathBuf,
    max_visits: usize,
    /// `None` once the store has been closed
    state: RwLock<Option<FileState>>,
}

impl FileStore {
    /// Open the document at `config.file_path()`, creating it when missing
    ///
    /// Fails with [`StoreError::Corrupted`] when the file is not a valid
    /// store document.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let path = config.file_path();
        let max_visits = config.max_visits.max(1);

        fs::create_dir_all(config.data_dir())?;
        let cleaned = cleanup_temp_files(config.data_dir())?;
        if cleaned > 0 {
            warn!(cleaned, "Removed leftover temp files from an interrupted write");
        }

        let mut state = if path.exists() {
            Self::load(&path)?
        } else {
            let state = FileState::default();
            Self::persist(&path, &state)?;
            state
        };

        let trimmed = state.trim(max_visits);
        if trimmed > 0 {
            Self::persist(&path, &state)?;
            info!(trimmed, max_visits, "Trimmed visit log to retention cap");
        }

        Ok(Self {
            path,
            max_visits,
            state: RwLock::new(Some(state)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> StoreResult<FileState> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(FileState::default());
        }

        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupted(format!("{}: {}", path.display(), e)))?;

        if value.is_array() {
            let visits: Vec<VisitRecord> = serde_json::from_value(value)
                .map_err(|e| StoreError::Corrupted(format!("{}: {}", path.display(), e)))?;
            warn!(
                visits = visits.len(),
                path = %path.display(),
                "Upgrading legacy visit array to the counted store format"
            );

            let backup = path.with_extension("legacy.json");
            if !backup.exists() {
                fs::copy(path, &backup)?;
            }

            let state = FileState::from_legacy(visits);
            Self::persist(path, &state)?;
            return Ok(state);
        }

        serde_json::from_value(value)
            .map_err(|e| StoreError::Corrupted(format!("{}: {}", path.display(), e)))
    }

    fn persist(path: &Path, state: &FileState) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(state)?;
        atomic_write(path, &content)?;
        Ok(())
    }
}

impl VisitStore for FileStore {
    fn append(&self, record: VisitRecord) -> StoreResult<()> {
        let mut guard = self.state.write();
        let current = guard.as_ref().ok_or(StoreError::Closed)?;

        let mut next = current.clone();
        next.apply_append(record, self.max_visits);

        if let Err(e) = Self::persist(&self.path, &next) {
            error!(error = %e, path = %self.path.display(), "Visit append rejected");
            return Err(e);
        }

        debug!(
            total_views = next.total_views,
            retained = next.visits.len(),
            "Visit appended"
        );
        *guard = Some(next);
        Ok(())
    }

    fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let guard = self.state.read();
        guard.as_ref().map(FileState::snapshot).ok_or(StoreError::Closed)
    }

    fn close(&self) -> StoreResult<()> {
        if self.state.write().take().is_some() {
            info!(path = %self.path.display(), "File store closed");
        }
        Ok(())
    }

    fn max_visits(&self) -> usize {
        self.max_visits
    }

    fn backend(&self) -> Backend {
        Backend::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn visit(ip: &str, second: u32) -> VisitRecord {
        VisitRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap(),
            source_address: ip.to_string(),
            user_agent: "test-agent".to_string(),
            referrer: String::new(),
            device_class: "Desktop · Other".to_string(),
            screen: None,
            language: None,
        }
    }

    fn create_test_store(max_visits: usize) -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(Backend::File, temp_dir.path()).with_max_visits(max_visits);
        let store = FileStore::open(&config).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_open_creates_empty_document() {
        let (store, _temp_dir) = create_test_store(10);

        assert!(store.path().exists());
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot, StoreSnapshot::default());
    }

    #[test]
    fn test_append_updates_log_and_counters() {
        let (store, _temp_dir) = create_test_store(10);

        store.append(visit("10.0.0.1", 1)).unwrap();
        store.append(visit("10.0.0.2", 2)).unwrap();
        store.append(visit("10.0.0.1", 3)).unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.total_views, 3);
        assert_eq!(snapshot.unique_visitors, 2);
        assert_eq!(snapshot.visits.len(), 3);
        assert_eq!(snapshot.visits[0], visit("10.0.0.1", 1));
        assert_eq!(snapshot.visits[2].source_address, "10.0.0.1");
    }

    #[test]
    fn test_trim_keeps_newest() {
        let (store, _temp_dir) = create_test_store(3);

        for i in 0..7 {
            store.append(visit(&format!("10.0.0.{}", i), i)).unwrap();
        }

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.total_views, 7);
        assert_eq!(snapshot.unique_visitors, 7);
        let ips: Vec<_> = snapshot.visits.iter().map(|v| v.source_address.as_str()).collect();
        assert_eq!(ips, vec!["10.0.0.4", "10.0.0.5", "10.0.0.6"]);
    }

    #[test]
    fn test_reopen_restores_state() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(Backend::File, temp_dir.path()).with_max_visits(2);

        {
            let store = FileStore::open(&config).unwrap();
            store.append(visit("10.0.0.1", 1)).unwrap();
            store.append(visit("10.0.0.2", 2)).unwrap();
            store.append(visit("10.0.0.3", 3)).unwrap();
            store.close().unwrap();
        }

        let store = FileStore::open(&config).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.total_views, 3);
        assert_eq!(snapshot.unique_visitors, 3);
        assert_eq!(snapshot.visits.len(), 2);
        assert_eq!(snapshot.visits[1].source_address, "10.0.0.3");
    }

    #[test]
    fn test_failed_persist_leaves_state_unchanged() {
        let (store, temp_dir) = create_test_store(2);
        store.append(visit("10.0.0.1", 1)).unwrap();
        store.append(visit("10.0.0.2", 2)).unwrap();
        let before = store.snapshot().unwrap();
        let file_before = fs::read_to_string(store.path()).unwrap();

        // Occupy the temp path so the atomic write cannot start.
        let blocker = temp_dir.path().join("visits.tmp");
        fs::create_dir(&blocker).unwrap();

        let result = store.append(visit("10.0.0.3", 3));
        assert!(matches!(result, Err(StoreError::Io(_))));

        assert_eq!(store.snapshot().unwrap(), before);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), file_before);

        // The store keeps working once the fault is gone.
        fs::remove_dir(&blocker).unwrap();
        store.append(visit("10.0.0.3", 3)).unwrap();
        let after = store.snapshot().unwrap();
        assert_eq!(after.total_views, 3);
        assert_eq!(after.visits[0].source_address, "10.0.0.2");
    }

    #[test]
    fn test_corrupt_document_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(Backend::File, temp_dir.path());
        fs::write(config.file_path(), "{ not json").unwrap();

        let result = FileStore::open(&config);
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn test_legacy_array_is_upgraded() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(Backend::File, temp_dir.path());
        let legacy = r#"[
  {"time":"2024-01-01T00:00:01Z","ip":"10.0.0.1","userAgent":"ua","referrer":"","device":"Desktop · Chrome","screen":"1920×1080","language":"en-US"},
  {"time":"2024-01-01T00:00:02Z","ip":"10.0.0.2","userAgent":"ua","referrer":"","device":"Mobile · Safari","screen":null,"language":null},
  {"time":"2024-01-01T00:00:03Z","ip":"10.0.0.1","userAgent":"ua","referrer":"","device":"Desktop · Chrome","screen":null,"language":null}
]"#;
        fs::write(config.file_path(), legacy).unwrap();

        let store = FileStore::open(&config).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.total_views, 3);
        assert_eq!(snapshot.unique_visitors, 2);
        assert_eq!(snapshot.visits[0].screen.as_deref(), Some("1920×1080"));

        assert!(config.file_path().with_extension("legacy.json").exists());
        let upgraded: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(config.file_path()).unwrap()).unwrap();
        assert_eq!(upgraded["totalViews"], 3);
    }

    #[test]
    fn test_open_trims_to_lowered_cap() {
        let temp_dir = TempDir::new().unwrap();
        let wide = StoreConfig::new(Backend::File, temp_dir.path()).with_max_visits(10);
        {
            let store = FileStore::open(&wide).unwrap();
            for i in 0..6 {
                store.append(visit("10.0.0.1", i)).unwrap();
            }
        }

        let narrow = wide.clone().with_max_visits(4);
        let store = FileStore::open(&narrow).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.visits.len(), 4);
        assert_eq!(snapshot.total_views, 6);
    }

    #[test]
    fn test_closed_store_rejects_calls() {
        let (store, _temp_dir) = create_test_store(10);
        store.close().unwrap();

        assert!(matches!(store.append(visit("10.0.0.1", 1)), Err(StoreError::Closed)));
        assert!(matches!(store.snapshot(), Err(StoreError::Closed)));
        // Closing twice is harmless.
        store.close().unwrap();
    }
}
