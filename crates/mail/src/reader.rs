//! Request-level entry point
//!
//! [`MailReader`] ties the decoder, sync engine and watch registrar
//! together and renders every outcome as a [`SyncResponse`]:
//!
//! ```json
//! { "status": true, "code": 200, "msg": "Success",
//!   "data": { "subject": "..", "body": "..", "from_email": ".." } }
//! ```
//!
//! Failures always render as `status: false`, `code: 400` with an empty
//! `data` object.

use anyhow::{Context, Result};
use log::{error, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{DecodeError, SyncError};
use crate::gmail::{GmailClient, RefreshTokenAuth};
use crate::models::{ExtractedEmail, Notification};
use crate::notification::NotificationDecoder;
use crate::provider::{MailProvider, TokenProvider, WatchResponse};
use crate::retry::Retrying;
use crate::storage::{CursorStore, JsonCursorStore};
use crate::sync::{ResultMode, SyncEngine, SyncOutcome, WatchRegistrar};

pub const SUCCESS_CODE: u16 = 200;
pub const FAILURE_CODE: u16 = 400;

/// Fields surfaced to the caller for one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailData {
    pub subject: Option<String>,
    pub body: String,
    pub from_email: Option<String>,
}

impl From<&ExtractedEmail> for EmailData {
    fn from(email: &ExtractedEmail) -> Self {
        Self {
            subject: email.subject.clone(),
            body: email.body.clone(),
            from_email: email.from_email.clone(),
        }
    }
}

/// Payload of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Last processed message ([`ResultMode::Last`])
    Email(EmailData),
    /// Every processed message ([`ResultMode::All`])
    Emails { emails: Vec<EmailData> },
    /// Nothing to report, or a failure
    Empty {},
}

impl ResponseData {
    fn from_outcome(outcome: &SyncOutcome, mode: ResultMode) -> Self {
        match mode {
            ResultMode::Last => outcome
                .last_email()
                .map(|email| Self::Email(email.into()))
                .unwrap_or(Self::Empty {}),
            ResultMode::All if outcome.emails.is_empty() => Self::Empty {},
            ResultMode::All => Self::Emails {
                emails: outcome.emails.iter().map(EmailData::from).collect(),
            },
        }
    }
}

/// Structured response returned for every inbound notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResponse {
    pub status: bool,
    pub code: u16,
    pub msg: String,
    pub data: ResponseData,
}

impl SyncResponse {
    pub fn success(data: ResponseData) -> Self {
        Self {
            status: true,
            code: SUCCESS_CODE,
            msg: "Success".to_string(),
            data,
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            status: false,
            code: FAILURE_CODE,
            msg: msg.into(),
            data: ResponseData::Empty {},
        }
    }

    fn from_error(error: &SyncError) -> Self {
        Self::failure(error.to_string())
    }
}

/// Decoder + engine + registrar for one mailbox
pub struct MailReader {
    decoder: NotificationDecoder,
    engine: SyncEngine,
    registrar: WatchRegistrar,
    topic_name: Option<String>,
}

impl MailReader {
    /// Wire the Gmail-backed reader described by `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let cursor_path = settings.cursor_path()?;
        let store = Arc::new(JsonCursorStore::new(cursor_path));
        let tokens = Arc::new(Retrying::new(
            RefreshTokenAuth::new(),
            settings.retry.clone(),
        ));
        let provider = Arc::new(Retrying::new(GmailClient::new(), settings.retry.clone()));

        Ok(Self::with_capabilities(settings, store, tokens, provider))
    }

    /// Wire a reader over caller-supplied capabilities
    pub fn with_capabilities(
        settings: &Settings,
        store: Arc<dyn CursorStore>,
        tokens: Arc<dyn TokenProvider>,
        provider: Arc<dyn MailProvider>,
    ) -> Self {
        let engine = SyncEngine::new(store, tokens, provider, settings.sync_config());
        let registrar = engine.registrar(vec![settings.watch_label.clone()]);

        Self {
            decoder: NotificationDecoder::new(&settings.subscription_name),
            engine,
            registrar,
            topic_name: settings.topic_name.clone(),
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Handle a raw push request body
    pub fn handle_payload(&self, raw: &[u8]) -> SyncResponse {
        match self.decoder.decode(raw) {
            Ok(notification) => self.handle_notification(&notification),
            Err(e) => self.rejected(e),
        }
    }

    /// Handle a push envelope the host has already parsed
    pub fn handle_value(&self, value: serde_json::Value) -> SyncResponse {
        match self.decoder.decode_value(value) {
            Ok(notification) => self.handle_notification(&notification),
            Err(e) => self.rejected(e),
        }
    }

    fn rejected(&self, error: DecodeError) -> SyncResponse {
        match error.detail() {
            Some(detail) => warn!("Rejected push payload: {} ({})", error, detail),
            None => warn!("Rejected push payload: {}", error),
        }
        SyncResponse::from_error(&SyncError::from(error))
    }

    fn handle_notification(&self, notification: &Notification) -> SyncResponse {
        match self.engine.handle(notification) {
            Ok(outcome) => SyncResponse::success(ResponseData::from_outcome(
                &outcome,
                self.engine.config().result_mode,
            )),
            Err(e) => {
                if e.is_history_expired() {
                    error!(
                        "History before {} is no longer available; messages in the gap were skipped",
                        notification.history_id
                    );
                } else {
                    error!("Failed to sync notification {}: {}", notification.history_id, e);
                }
                SyncResponse::from_error(&e)
            }
        }
    }

    /// Register the watch on `topic`, or on the configured topic
    pub fn register_watch(&self, topic: Option<&str>) -> Result<WatchResponse> {
        let topic = topic
            .or(self.topic_name.as_deref())
            .context("No topic given and no topic_name configured")?;
        self.registrar
            .register(topic)
            .with_context(|| format!("Failed to register watch on {topic}"))
    }
}
