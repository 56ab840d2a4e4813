//! Decoded push notification

use super::HistoryId;

/// A validated push notification announcing a new mailbox history point.
///
/// Transient: one per inbound call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Subscription the push was delivered through
    pub subscription_id: String,
    /// New history marker announced by the provider
    pub history_id: HistoryId,
    /// Mailbox address reported in the inner payload, when present
    pub email_address: Option<String>,
}
