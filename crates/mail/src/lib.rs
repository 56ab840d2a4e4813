//! pushmail - Gmail push-notification reader
//!
//! This crate turns Gmail Pub/Sub push notifications into the messages
//! that arrived since the previous notification:
//! - Notification decoding and subscription check
//! - Single-record cursor (historyId) storage
//! - Sync engine over injected token and mailbox capabilities
//! - Message field extraction (sender, subject, body)
//! - Watch registration that seeds the cursor
//! - Gmail REST implementations of the capabilities, with retry
//!
//! The engine is synchronous and executor-agnostic.

pub mod config;
pub mod error;
pub mod extract;
pub mod gmail;
pub mod models;
pub mod notification;
pub mod provider;
pub mod reader;
pub mod retry;
pub mod storage;
pub mod sync;

pub use config::Settings;
pub use error::{CursorStoreError, DecodeError, ProviderError, SyncError};
pub use extract::extract;
pub use gmail::{GmailClient, RefreshTokenAuth};
pub use models::{ExtractedEmail, Header, HistoryId, Message, MessageId, MessagePart, Notification};
pub use notification::NotificationDecoder;
pub use provider::{
    AccessToken, Credential, HistoryBatch, MailProvider, TokenProvider,
    WatchRequest, WatchResponse,
};
pub use reader::{EmailData, MailReader, ResponseData, SyncResponse};
pub use retry::{RetryPolicy, Retrying};
pub use storage::{CursorStore, InMemoryCursorStore, JsonCursorStore};
pub use sync::{ResultMode, SyncConfig, SyncEngine, SyncOutcome, WatchRegistrar};
