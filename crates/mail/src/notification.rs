//! Push notification decoding
//!
//! Gmail publishes mailbox changes to a Pub/Sub topic; the push endpoint
//! receives an envelope of the form
//!
//! ```json
//! { "message": { "data": "<base64 of {\"emailAddress\":..,\"historyId\":..}>" },
//!   "subscription": "projects/p/subscriptions/s" }
//! ```
//!
//! [`NotificationDecoder`] validates the envelope and yields a
//! [`Notification`]. Decoding has no side effects.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;

use crate::error::DecodeError;
use crate::models::{HistoryId, Notification};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Outer Pub/Sub push envelope
#[derive(Debug, Deserialize)]
struct PushEnvelope {
    message: Option<PushMessage>,
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushMessage {
    data: Option<String>,
}

/// Inner Gmail notification, carried base64-encoded in `message.data`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailNotification {
    email_address: Option<String>,
    history_id: Option<HistoryId>,
}

/// Validates push envelopes against the single configured subscription
#[derive(Debug, Clone)]
pub struct NotificationDecoder {
    subscription_name: String,
}

impl NotificationDecoder {
    pub fn new(subscription_name: impl Into<String>) -> Self {
        Self {
            subscription_name: subscription_name.into(),
        }
    }

    /// Decode a raw request body
    pub fn decode(&self, raw: &[u8]) -> Result<Notification, DecodeError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::EmptyPayload);
        }
        let envelope: PushEnvelope = serde_json::from_slice(raw)
            .map_err(|e| DecodeError::MalformedPayload(format!("envelope: {e}")))?;
        self.decode_envelope(envelope)
    }

    /// Decode an envelope the host has already parsed
    pub fn decode_value(&self, value: serde_json::Value) -> Result<Notification, DecodeError> {
        let envelope: PushEnvelope = serde_json::from_value(value)
            .map_err(|e| DecodeError::MalformedPayload(format!("envelope: {e}")))?;
        self.decode_envelope(envelope)
    }

    fn decode_envelope(&self, envelope: PushEnvelope) -> Result<Notification, DecodeError> {
        let data = envelope
            .message
            .and_then(|m| m.data)
            .filter(|d| !d.trim().is_empty())
            .ok_or(DecodeError::EmptyPayload)?;

        let inner = decode_base64(data.trim())?;
        if inner.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::EmptyPayload);
        }

        let notification: GmailNotification = serde_json::from_slice(&inner)
            .map_err(|e| DecodeError::MalformedPayload(format!("notification: {e}")))?;

        let subscription = envelope.subscription.unwrap_or_default();
        if subscription != self.subscription_name {
            return Err(DecodeError::UnauthorizedSubscription {
                expected: self.subscription_name.clone(),
                actual: subscription,
            });
        }

        let history_id = notification
            .history_id
            .ok_or_else(|| DecodeError::MalformedPayload("notification: missing historyId".into()))?;

        Ok(Notification {
            subscription_id: subscription,
            history_id,
            email_address: notification.email_address,
        })
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD_LENIENT
        .decode(data)
        .or_else(|_| URL_SAFE_LENIENT.decode(data))
        .map_err(|e| DecodeError::MalformedPayload(format!("message.data: {e}")))
}
