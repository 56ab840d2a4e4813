//! Error types for notification handling

use std::io;
use std::path::PathBuf;

/// Inbound payload rejected before any state was touched.
///
/// All variants are terminal for the call; retrying the same bytes yields
/// the same error.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// `message.data` missing, empty, or decoded to nothing
    #[error("Invalid request")]
    EmptyPayload,

    /// Payload was not valid JSON/base64, or lacked a historyId
    #[error("Invalid JSON")]
    MalformedPayload(String),

    /// Push arrived through a subscription other than the configured one
    #[error("Not subscribed to defined subscription")]
    UnauthorizedSubscription { expected: String, actual: String },
}

impl DecodeError {
    /// Detail for logs; the display text stays fixed for callers
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::EmptyPayload => None,
            Self::MalformedPayload(reason) => Some(reason.clone()),
            Self::UnauthorizedSubscription { expected, actual } => {
                Some(format!("expected '{expected}', got '{actual}'"))
            }
        }
    }
}

/// Cursor persistence fault. Never swallowed.
#[derive(Debug, thiserror::Error)]
pub enum CursorStoreError {
    #[error("cursor store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cursor store at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cursor store lock poisoned")]
    Poisoned,
}

/// Failure reported by a provider capability (token exchange, Gmail REST).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The start historyId fell out of the provider's retention window
    #[error("History ID expired or invalid")]
    HistoryExpired,

    #[error("{operation} rejected with HTTP {status}")]
    Status { operation: &'static str, status: u16 },

    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} returned an unusable response: {reason}")]
    InvalidResponse {
        operation: &'static str,
        reason: String,
    },
}

impl ProviderError {
    /// Whether repeating the same call could succeed.
    ///
    /// Transport faults, throttling and server errors are retryable;
    /// an expired marker or any other client error is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::HistoryExpired | Self::InvalidResponse { .. } => false,
        }
    }

    pub(crate) fn from_ureq(operation: &'static str, error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(status) => Self::Status { operation, status },
            other => Self::Transport {
                operation,
                message: other.to_string(),
            },
        }
    }
}

/// Failure while handling a notification or registering a watch.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Storage(#[from] CursorStoreError),

    #[error("credential exchange failed: {0}")]
    Credential(#[source] ProviderError),

    #[error("{0}")]
    Fetch(#[source] ProviderError),

    #[error("processing failed: {0}")]
    Processing(String),
}

impl SyncError {
    /// True when the history marker was out of the provider's retention window
    pub fn is_history_expired(&self) -> bool {
        matches!(self, Self::Fetch(ProviderError::HistoryExpired))
    }
}
