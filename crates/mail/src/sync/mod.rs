//! Sync engine for push notifications
//!
//! - [`SyncEngine`] turns one notification into the messages added since
//!   the previous cursor.
//! - [`WatchRegistrar`] (re)subscribes the mailbox and seeds the cursor.

mod engine;
mod watch;

pub use engine::{ResultMode, SyncConfig, SyncEngine, SyncOutcome, UNREAD_LABEL};
pub use watch::{DEFAULT_WATCH_LABEL, WatchRegistrar};
