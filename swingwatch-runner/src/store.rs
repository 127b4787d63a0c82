//! Per-ticker state persistence.
//!
//! The state book maps symbol to `TickerState` and is stored as one JSON
//! document. Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Absent file loads as an empty book
//! - Malformed file is quarantined (`{file}.quarantined`) and loads as empty;
//!   a read-only store logs it and leaves the file in place

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use swingwatch_core::domain::TickerState;
use thiserror::Error;
use tracing::warn;

/// All persisted ticker states, ordered by symbol.
pub type StateBook = BTreeMap<String, TickerState>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encode state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("state file {path} opened read-only")]
    ReadOnly { path: PathBuf },
}

/// Durable storage for the state book.
pub trait StateStore {
    /// Read the whole book. Absent or malformed storage yields an empty book.
    fn load(&self) -> Result<StateBook, StoreError>;

    /// Replace the stored book. Either the old or the new book survives a crash.
    fn save(&self, book: &StateBook) -> Result<(), StoreError>;
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    read_only: bool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
        }
    }

    /// A store for inspection and dry runs: `load` never renames a malformed
    /// file and `save` is refused.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn quarantine(&self) {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".quarantined");
        let target = PathBuf::from(name);
        if let Err(e) = fs::rename(&self.path, &target) {
            warn!(
                path = %self.path.display(),
                error = %e,
                "could not quarantine malformed state file"
            );
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<StateBook, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StateBook::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(StateBook::new());
        }
        match serde_json::from_str(&content) {
            Ok(book) => Ok(book),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "malformed state file, starting from empty state"
                );
                if !self.read_only {
                    self.quarantine();
                }
                Ok(StateBook::new())
            }
        }
    }

    fn save(&self, book: &StateBook) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly {
                path: self.path.clone(),
            });
        }
        let json = serde_json::to_string_pretty(book)?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| self.io_err(e))
    }
}

/// Write `bytes` to `{path}.tmp`, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);

    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        e
    })
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    book: Mutex<StateBook>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new(book: StateBook) -> Self {
        Self {
            book: Mutex::new(book),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> StateBook {
        self.book.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<StateBook, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, book: &StateBook) -> Result<(), StoreError> {
        *self.book.lock().unwrap_or_else(PoisonError::into_inner) = book.clone();
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use swingwatch_core::domain::{OpenPosition, Position};

    fn sample_book() -> StateBook {
        let t = Utc.with_ymd_and_hms(2024, 6, 3, 5, 30, 0).unwrap();
        let mut pos = OpenPosition::new(2913.5, t, 2849.151);
        pos.tp1_sent = true;
        let mut book = StateBook::new();
        book.insert(
            "7203.T".into(),
            TickerState {
                position: Position::Long(pos),
                last_signal_bar: Some(t),
            },
        );
        book.insert("6503.T".into(), TickerState::flat());
        book
    }

    #[test]
    fn absent_file_is_empty_book() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/state.json"));
        let book = sample_book();
        store.save(&book).unwrap();
        assert_eq!(store.load().unwrap(), book);
        // no temp file left behind
        assert!(!dir.path().join("nested/state.json.tmp").exists());
    }

    #[test]
    fn malformed_file_is_quarantined_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(store.load().unwrap().is_empty());
        assert!(!path.exists());
        assert!(dir.path().join("state.json.quarantined").exists());
    }

    #[test]
    fn read_only_store_leaves_malformed_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::read_only(&path);
        assert!(store.load().unwrap().is_empty());
        assert!(path.exists());
        assert!(!dir.path().join("state.json.quarantined").exists());
        assert!(matches!(store.save(&sample_book()), Err(StoreError::ReadOnly { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn empty_file_is_empty_book() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "\n").unwrap();
        assert!(JsonFileStore::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn stored_shape_is_status_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        store.save(&sample_book()).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["7203.T"]["position"]["status"], "LONG");
        assert_eq!(raw["7203.T"]["position"]["tp1_sent"], true);
        assert_eq!(raw["6503.T"]["position"]["status"], "FLAT");
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryStore::default();
        store.save(&sample_book()).unwrap();
        store.save(&sample_book()).unwrap();
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load().unwrap().len(), 2);
    }
}
