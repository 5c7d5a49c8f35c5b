//! Bounded, append-only ledger of successful signing runs

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use droidsign_core::config::write_atomic;

use crate::error::{Result, SigningError};

/// Number of entries kept on disk
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// Outcome recorded in a history entry.
///
/// Only successful runs are appended. `Failed` is accepted when reading so
/// that files written by older tools with failed entries still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Success,
    Failed,
}

impl std::fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One signing run as recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the run finished
    pub timestamp: DateTime<Utc>,

    /// Input archive
    pub original_apk: PathBuf,

    /// Signed, aligned output archive
    pub signed_apk: PathBuf,

    /// SHA-256 of the input before signing
    pub original_hash: String,

    /// SHA-256 of the output after verification
    pub signed_hash: String,

    pub status: HistoryStatus,
}

impl HistoryEntry {
    /// Create a success entry stamped with the current time
    pub fn success(
        original_apk: impl Into<PathBuf>,
        signed_apk: impl Into<PathBuf>,
        original_hash: impl Into<String>,
        signed_hash: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            original_apk: original_apk.into(),
            signed_apk: signed_apk.into(),
            original_hash: original_hash.into(),
            signed_hash: signed_hash.into(),
            status: HistoryStatus::Success,
        }
    }
}

/// Signing history persisted as a JSON array.
///
/// Every append and clear takes an exclusive lock on `<file>.lock`, re-reads
/// the file, applies the change and persists it before releasing the lock.
/// Workers in this process and other processes sharing the file therefore
/// never interleave a read-modify-persist cycle. Only the most recent
/// [`MAX_HISTORY_ENTRIES`] are kept.
#[derive(Debug)]
pub struct HistoryLedger {
    path: PathBuf,
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryLedger {
    /// Load the ledger from `path`.
    ///
    /// A missing file is an empty ledger. So is an unreadable or corrupt
    /// one; that case is logged and never returned to the caller.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => {
                debug!(path = %path.display(), count = entries.len(), "history loaded");
                entries
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "error loading history, starting empty");
                Vec::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Path of the history file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of all entries, oldest first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    /// Entry at `index` (0 is the oldest)
    pub fn get(&self, index: usize) -> Option<HistoryEntry> {
        self.lock().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append an entry and persist the most recent entries.
    ///
    /// Entries written by other processes since this ledger was loaded are
    /// kept.
    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.lock();
        self.with_file_lock(|| {
            let mut current = self.reload();
            current.push(entry);
            truncate_front(&mut current);
            self.persist(&current)?;
            *entries = current;
            Ok(())
        })?;
        info!(path = %self.path.display(), count = entries.len(), "history entry appended");
        Ok(())
    }

    /// Remove every entry and persist the empty ledger
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.lock();
        self.with_file_lock(|| {
            self.persist(&[])?;
            entries.clear();
            Ok(())
        })?;
        info!(path = %self.path.display(), "history cleared");
        Ok(())
    }

    /// Path of the sidecar file locked around every change
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Run `change` while holding an exclusive OS lock on the sidecar file
    fn with_file_lock<T>(&self, change: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SigningError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| SigningError::io(&lock_path, e))?;

        let mut lock = RwLock::new(file);
        let _guard = lock.write().map_err(|e| SigningError::io(&lock_path, e))?;
        change()
    }

    /// Current contents of the file; unreadable contents are replaced
    fn reload(&self) -> Vec<HistoryEntry> {
        read_entries(&self.path).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "history file unreadable, rewriting it");
            Vec::new()
        })
    }

    fn persist(&self, entries: &[HistoryEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| SigningError::Parse(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| SigningError::io(&self.path, e))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn truncate_front(entries: &mut Vec<HistoryEntry>) {
    if entries.len() > MAX_HISTORY_ENTRIES {
        let excess = entries.len() - MAX_HISTORY_ENTRIES;
        entries.drain(..excess);
    }
}

fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| SigningError::io(path, e))?;
    let mut entries: Vec<HistoryEntry> =
        serde_json::from_str(&content).map_err(|e| SigningError::Parse(e.to_string()))?;
    truncate_front(&mut entries);
    Ok(entries)
}
