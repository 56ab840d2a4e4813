//! Provider capabilities consumed by the sync engine
//!
//! The engine never talks to Google directly. It calls these traits, which
//! are implemented over the Gmail REST API in [`crate::gmail`] and by fakes
//! in tests.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::ProviderError;
use crate::models::{HistoryId, Message, MessageId};

/// Long-lived OAuth credential for the mailbox being watched
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Short-lived bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// One history record: the messages it reports as added, in provider order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryBatch {
    pub messages_added: Vec<MessageId>,
}

/// Subscription request sent to the provider.
///
/// Only changes to messages carrying one of `label_ids` are pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    pub topic_name: String,
    pub label_ids: Vec<String>,
}

/// Provider's answer to a watch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchResponse {
    /// Current mailbox history point, used to seed the cursor
    pub history_id: HistoryId,
    /// When the watch lapses and must be renewed
    pub expiration: Option<DateTime<Utc>>,
}

/// Exchanges the long-lived credential for an access token
pub trait TokenProvider: Send + Sync {
    fn access_token(&self, credential: &Credential) -> Result<AccessToken, ProviderError>;
}

/// Mailbox operations needed by the sync engine and watch registrar
pub trait MailProvider: Send + Sync {
    /// All history records after `start`, across every page.
    ///
    /// Returns [`ProviderError::HistoryExpired`] when `start` is older than
    /// the provider retains.
    fn list_history(
        &self,
        token: &AccessToken,
        start: &HistoryId,
    ) -> Result<Vec<HistoryBatch>, ProviderError>;

    /// Fetch a full message
    fn get_message(&self, token: &AccessToken, id: &MessageId) -> Result<Message, ProviderError>;

    /// Remove labels from a message. Removing an absent label is a no-op.
    fn remove_labels(
        &self,
        token: &AccessToken,
        id: &MessageId,
        labels: &[&str],
    ) -> Result<(), ProviderError>;

    /// Start (or renew) push notifications for the mailbox
    fn watch(
        &self,
        token: &AccessToken,
        request: &WatchRequest,
    ) -> Result<WatchResponse, ProviderError>;
}
