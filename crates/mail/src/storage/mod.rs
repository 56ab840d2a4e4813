//! Cursor storage
//!
//! The trait-based design allows swapping between the JSON file used in
//! deployments and the in-memory store used by tests.

mod file;
mod memory;
mod traits;

pub use file::JsonCursorStore;
pub use memory::InMemoryCursorStore;
pub use traits::CursorStore;
