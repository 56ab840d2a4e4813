//! Storage trait definitions

use crate::error::CursorStoreError;
use crate::models::HistoryId;

/// Single-record store for the last processed history marker
///
/// Implementations hold exactly one cursor. `read` distinguishes "never
/// written" (`Ok(None)`) from a storage fault (`Err`); `write` replaces
/// the stored value wholesale and is atomic from the caller's view.
pub trait CursorStore: Send + Sync {
    /// Read the current cursor, `None` on first run or after a reset
    fn read(&self) -> Result<Option<HistoryId>, CursorStoreError>;

    /// Replace the stored cursor
    fn write(&self, history_id: &HistoryId) -> Result<(), CursorStoreError>;
}
