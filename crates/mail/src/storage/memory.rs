//! In-memory cursor store
//!
//! Used in tests and for hosts that do not need the cursor to survive a
//! restart.

use std::sync::RwLock;

use super::CursorStore;
use crate::error::CursorStoreError;
use crate::models::HistoryId;

/// In-memory implementation of CursorStore
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    cursor: RwLock<Option<HistoryId>>,
}

impl InMemoryCursorStore {
    /// Create an empty store (first-run state)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a cursor
    pub fn with_cursor(history_id: impl Into<HistoryId>) -> Self {
        Self {
            cursor: RwLock::new(Some(history_id.into())),
        }
    }
}

impl CursorStore for InMemoryCursorStore {
    fn read(&self) -> Result<Option<HistoryId>, CursorStoreError> {
        self.cursor
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| CursorStoreError::Poisoned)
    }

    fn write(&self, history_id: &HistoryId) -> Result<(), CursorStoreError> {
        let mut guard = self.cursor.write().map_err(|_| CursorStoreError::Poisoned)?;
        *guard = Some(history_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_reads_none() {
        let store = InMemoryCursorStore::new();
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_write_replaces_value() {
        let store = InMemoryCursorStore::with_cursor("100");
        store.write(&HistoryId::new("150")).unwrap();
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("150")));
    }
}
