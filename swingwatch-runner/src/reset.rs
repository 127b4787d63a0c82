//! Manual reset inbox.
//!
//! A JSON object whose keys are symbols to force flat on the next run; values
//! are ignored (`swingwatch reset` writes the request time). The driver reads
//! the inbox at run start and, once the resets are saved, removes exactly the
//! keys it applied. Requests written while a run is in progress survive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::store::{write_atomic, StoreError};

#[derive(Debug, Clone)]
pub struct ResetInbox {
    path: PathBuf,
}

impl ResetInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
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

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "reset inbox is not a JSON object, ignoring it");
                Ok(Map::new())
            }
        }
    }

    /// Symbols awaiting a reset, sorted.
    pub fn pending(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read_map()?.into_iter().map(|(symbol, _)| symbol).collect())
    }

    /// Add reset requests, keeping any already pending.
    pub fn request<S: AsRef<str>>(
        &self,
        symbols: &[S],
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        for symbol in symbols {
            map.insert(symbol.as_ref().to_string(), Value::String(at.to_rfc3339()));
        }
        self.write(&map)
    }

    /// Remove `symbols` from the inbox, keeping any request added since they
    /// were read.
    pub fn consume<S: AsRef<str>>(&self, symbols: &[S]) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        for symbol in symbols {
            map.remove(symbol.as_ref());
        }
        self.write(&map)
    }

    fn write(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(map)?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| self.io_err(e))
    }
}
