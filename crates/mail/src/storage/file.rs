//! JSON file cursor store
//!
//! Persists the cursor as `{ "historyId": "..." }` at a fixed path.

use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::CursorStore;
use crate::error::CursorStoreError;
use crate::models::{CursorRecord, HistoryId};

/// Default cursor filename in the pushmail config directory
pub const CURSOR_FILE: &str = "gmail_history.json";

/// File-backed implementation of CursorStore
#[derive(Debug, Clone)]
pub struct JsonCursorStore {
    path: PathBuf,
}

impl JsonCursorStore {
    /// Create a store backed by `path`; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default cursor location (~/.config/pushmail/gmail_history.json)
    pub fn default_path() -> Option<PathBuf> {
        config::config_path(CURSOR_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CursorStore for JsonCursorStore {
    fn read(&self) -> Result<Option<HistoryId>, CursorStoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cursor at {}, treating as first run", self.path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(CursorStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let record: CursorRecord =
            serde_json::from_str(&content).map_err(|source| CursorStoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(record.history_id)
    }

    fn write(&self, history_id: &HistoryId) -> Result<(), CursorStoreError> {
        config::write_json_atomic(&self.path, &CursorRecord::new(history_id.clone())).map_err(
            |source| CursorStoreError::Io {
                path: self.path.clone(),
                source,
            },
        )?;
        debug!("Cursor advanced to {}", history_id);
        Ok(())
    }
}
