//! Notification-driven incremental sync
//!
//! For each notification the engine reads the previous cursor, advances
//! the cursor to the notification's history ID *before* touching the
//! provider, then walks the history since the previous cursor.
//!
//! Advancing first means a failed fetch is never retried automatically:
//! processing is at-most-once per notification, and a poison notification
//! cannot wedge the mailbox.

use log::{debug, info, warn};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use super::watch::WatchRegistrar;
use crate::error::{ProviderError, SyncError};
use crate::extract::extract;
use crate::models::{ExtractedEmail, HistoryId, MessageId, Notification};
use crate::provider::{Credential, MailProvider, TokenProvider};
use crate::storage::CursorStore;

/// Gmail system label cleared by mark-as-read
pub const UNREAD_LABEL: &str = "UNREAD";

/// How many extracted messages a sync reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    /// Every added message is processed; only the last one is reported
    #[default]
    Last,
    /// Every added message is processed and reported, in provider order
    All,
}

impl FromStr for ResultMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "all" => Ok(Self::All),
            other => Err(format!("unknown result mode '{other}' (expected 'last' or 'all')")),
        }
    }
}

/// Explicit configuration for the engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Credential exchanged for an access token on every sync
    pub credential: Credential,
    /// Remove the UNREAD label from each added message
    pub mark_as_read: bool,
    pub result_mode: ResultMode,
}

/// Result of handling one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Cursor before this notification (`None` on first run)
    pub previous_cursor: Option<HistoryId>,
    /// Cursor now stored
    pub cursor: HistoryId,
    /// Number of added messages fetched and extracted
    pub messages_processed: usize,
    /// Extracted messages per [`ResultMode`]; empty when nothing was added
    pub emails: Vec<ExtractedEmail>,
}

impl SyncOutcome {
    /// The most recently processed message, if any
    pub fn last_email(&self) -> Option<&ExtractedEmail> {
        self.emails.last()
    }
}

/// Orchestrates cursor bookkeeping, history fetch and extraction
pub struct SyncEngine {
    store: Arc<dyn CursorStore>,
    tokens: Arc<dyn TokenProvider>,
    provider: Arc<dyn MailProvider>,
    config: SyncConfig,
    /// Serializes cursor read/write across concurrent callers
    mailbox_lock: Arc<Mutex<()>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn CursorStore>,
        tokens: Arc<dyn TokenProvider>,
        provider: Arc<dyn MailProvider>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            provider,
            config,
            mailbox_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Watch registrar sharing this engine's store, capabilities and lock
    pub fn registrar(&self, label_ids: Vec<String>) -> WatchRegistrar {
        WatchRegistrar::new(
            Arc::clone(&self.store),
            Arc::clone(&self.tokens),
            Arc::clone(&self.provider),
            self.config.credential.clone(),
            label_ids,
            Arc::clone(&self.mailbox_lock),
        )
    }

    /// Handle a decoded notification
    ///
    /// Errors after the cursor write are reported but do not roll the
    /// cursor back.
    pub fn handle(&self, notification: &Notification) -> Result<SyncOutcome, SyncError> {
        let _guard = self
            .mailbox_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let previous = self.store.read()?;
        self.store.write(&notification.history_id)?;

        if let Some(prev) = &previous
            && is_regression(prev, &notification.history_id)
        {
            warn!(
                "Notification history ID {} is older than stored cursor {}",
                notification.history_id, prev
            );
        }

        let Some(start) = previous else {
            info!(
                "No previous cursor; seeded at {} with nothing to diff",
                notification.history_id
            );
            return Ok(SyncOutcome {
                previous_cursor: None,
                cursor: notification.history_id.clone(),
                messages_processed: 0,
                emails: Vec::new(),
            });
        };

        info!("Syncing history {} -> {}", start, notification.history_id);

        let token = self
            .tokens
            .access_token(&self.config.credential)
            .map_err(SyncError::Credential)?;

        let batches = self
            .provider
            .list_history(&token, &start)
            .map_err(SyncError::Fetch)?;

        let mut emails = Vec::new();
        let mut messages_processed = 0;

        for batch in &batches {
            for id in &batch.messages_added {
                let message = self
                    .provider
                    .get_message(&token, id)
                    .map_err(|e| message_error(id, e))?;

                if self.config.mark_as_read {
                    self.provider
                        .remove_labels(&token, id, &[UNREAD_LABEL])
                        .map_err(SyncError::Fetch)?;
                    debug!("Marked message {} as read", id.as_str());
                }

                let email = extract(&message);
                messages_processed += 1;

                match self.config.result_mode {
                    ResultMode::Last => {
                        emails.clear();
                        emails.push(email);
                    }
                    ResultMode::All => emails.push(email),
                }
            }
        }

        info!(
            "Processed {} added messages from {} history records",
            messages_processed,
            batches.len()
        );

        Ok(SyncOutcome {
            previous_cursor: Some(start),
            cursor: notification.history_id.clone(),
            messages_processed,
            emails,
        })
    }
}

/// An unusable message payload is a processing fault, not a fetch fault
fn message_error(id: &MessageId, error: ProviderError) -> SyncError {
    match error {
        ProviderError::InvalidResponse { reason, .. } => {
            SyncError::Processing(format!("message {}: {reason}", id.as_str()))
        }
        other => SyncError::Fetch(other),
    }
}

/// True when both IDs are numeric and `next` is older than `current`
fn is_regression(current: &HistoryId, next: &HistoryId) -> bool {
    match (
        current.as_str().parse::<u64>(),
        next.as_str().parse::<u64>(),
    ) {
        (Ok(current), Ok(next)) => next < current,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CursorStoreError;
    use crate::models::Message;
    use crate::provider::{AccessToken, HistoryBatch, WatchRequest, WatchResponse};
    use crate::storage::InMemoryCursorStore;
    use base64::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every provider call together with the cursor visible at the time
    struct FakeProvider {
        store: Arc<InMemoryCursorStore>,
        history: Result<Vec<HistoryBatch>, ()>,
        messages: Vec<Message>,
        calls: Mutex<Vec<String>>,
        cursor_at_fetch: Mutex<Option<Option<HistoryId>>>,
    }

    impl FakeProvider {
        fn new(store: Arc<InMemoryCursorStore>, history: Vec<Vec<&str>>) -> Self {
            let history = history
                .into_iter()
                .map(|ids| HistoryBatch {
                    messages_added: ids.into_iter().map(MessageId::new).collect(),
                })
                .collect();
            Self {
                store,
                history: Ok(history),
                messages: Vec::new(),
                calls: Mutex::new(Vec::new()),
                cursor_at_fetch: Mutex::new(None),
            }
        }

        fn expired(store: Arc<InMemoryCursorStore>) -> Self {
            Self {
                history: Err(()),
                ..Self::new(store, Vec::new())
            }
        }

        fn with_message(mut self, id: &str, from: &str, subject: &str, body: &str) -> Self {
            self.messages.push(
                Message::builder(MessageId::new(id))
                    .header("From", from)
                    .header("Subject", subject)
                    .part("text/plain", BASE64_URL_SAFE_NO_PAD.encode(body))
                    .build(),
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MailProvider for FakeProvider {
        fn list_history(
            &self,
            _token: &AccessToken,
            start: &HistoryId,
        ) -> Result<Vec<HistoryBatch>, ProviderError> {
            self.calls.lock().unwrap().push(format!("history:{start}"));
            *self.cursor_at_fetch.lock().unwrap() = Some(self.store.read().unwrap());
            self.history
                .clone()
                .map_err(|_| ProviderError::HistoryExpired)
        }

        fn get_message(&self, _token: &AccessToken, id: &MessageId) -> Result<Message, ProviderError> {
            self.calls.lock().unwrap().push(format!("get:{}", id.as_str()));
            if id.as_str() == "broken" {
                return Err(ProviderError::InvalidResponse {
                    operation: "messages.get",
                    reason: "message has no payload".into(),
                });
            }
            self.messages
                .iter()
                .find(|m| &m.id == id)
                .cloned()
                .ok_or(ProviderError::Status {
                    operation: "messages.get",
                    status: 404,
                })
        }

        fn remove_labels(
            &self,
            _token: &AccessToken,
            id: &MessageId,
            labels: &[&str],
        ) -> Result<(), ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("modify:{}:-{}", id.as_str(), labels.join(",")));
            Ok(())
        }

        fn watch(
            &self,
            _token: &AccessToken,
            _request: &WatchRequest,
        ) -> Result<WatchResponse, ProviderError> {
            unreachable!("sync never registers a watch")
        }
    }

    struct FakeTokens {
        fail: bool,
    }

    impl TokenProvider for FakeTokens {
        fn access_token(&self, _credential: &Credential) -> Result<AccessToken, ProviderError> {
            if self.fail {
                Err(ProviderError::Status {
                    operation: "token exchange",
                    status: 400,
                })
            } else {
                Ok(AccessToken::new("token", None))
            }
        }
    }

    fn config(mark_as_read: bool, result_mode: ResultMode) -> SyncConfig {
        SyncConfig {
            credential: Credential {
                client_id: "id".into(),
                client_secret: "secret".into(),
                refresh_token: "refresh".into(),
            },
            mark_as_read,
            result_mode,
        }
    }

    fn engine(
        store: &Arc<InMemoryCursorStore>,
        provider: &Arc<FakeProvider>,
        config: SyncConfig,
    ) -> SyncEngine {
        SyncEngine::new(
            store.clone(),
            Arc::new(FakeTokens { fail: false }),
            provider.clone(),
            config,
        )
    }

    fn notification(history_id: &str) -> Notification {
        Notification {
            subscription_id: "sub".into(),
            history_id: HistoryId::new(history_id),
            email_address: None,
        }
    }

    #[test]
    fn test_first_run_seeds_cursor_without_fetching() {
        let store = Arc::new(InMemoryCursorStore::new());
        let provider = Arc::new(FakeProvider::new(store.clone(), vec![vec!["m1"]]));
        let engine = engine(&store, &provider, config(false, ResultMode::Last));

        let outcome = engine.handle(&notification("150")).unwrap();

        assert_eq!(outcome.previous_cursor, None);
        assert!(outcome.emails.is_empty());
        assert!(provider.calls().is_empty());
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("150")));
    }

    #[test]
    fn test_cursor_written_before_history_fetch() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(FakeProvider::new(store.clone(), Vec::new()));
        let engine = engine(&store, &provider, config(false, ResultMode::Last));

        engine.handle(&notification("150")).unwrap();

        assert_eq!(provider.calls(), vec!["history:100"]);
        assert_eq!(
            *provider.cursor_at_fetch.lock().unwrap(),
            Some(Some(HistoryId::new("150")))
        );
    }

    #[test]
    fn test_single_added_message() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(
            FakeProvider::new(store.clone(), vec![vec!["m1"]])
                .with_message("m1", "Jane Doe <jane@x.com>", "Hello", "body one"),
        );
        let engine = engine(&store, &provider, config(false, ResultMode::Last));

        let outcome = engine.handle(&notification("150")).unwrap();

        assert_eq!(store.read().unwrap(), Some(HistoryId::new("150")));
        assert_eq!(outcome.messages_processed, 1);
        let email = outcome.last_email().unwrap();
        assert_eq!(email.from_email.as_deref(), Some("jane@x.com"));
        assert_eq!(email.subject.as_deref(), Some("Hello"));
        assert_eq!(email.body, "body one");
    }

    #[test]
    fn test_last_mode_reports_only_last_message() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(
            FakeProvider::new(store.clone(), vec![vec!["m1"], vec!["m2"]])
                .with_message("m1", "a@x.com", "first", "one")
                .with_message("m2", "b@x.com", "second", "two"),
        );
        let engine = engine(&store, &provider, config(false, ResultMode::Last));

        let outcome = engine.handle(&notification("150")).unwrap();

        assert_eq!(outcome.messages_processed, 2);
        assert_eq!(outcome.emails.len(), 1);
        assert_eq!(outcome.emails[0].subject.as_deref(), Some("second"));
        assert_eq!(provider.calls(), vec!["history:100", "get:m1", "get:m2"]);
    }

    #[test]
    fn test_all_mode_reports_every_message_in_order() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(
            FakeProvider::new(store.clone(), vec![vec!["m1", "m2"]])
                .with_message("m1", "a@x.com", "first", "one")
                .with_message("m2", "b@x.com", "second", "two"),
        );
        let engine = engine(&store, &provider, config(false, ResultMode::All));

        let outcome = engine.handle(&notification("150")).unwrap();

        let subjects: Vec<_> = outcome
            .emails
            .iter()
            .map(|e| e.subject.as_deref().unwrap())
            .collect();
        assert_eq!(subjects, vec!["first", "second"]);
    }

    #[test]
    fn test_mark_as_read_after_fetch() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(
            FakeProvider::new(store.clone(), vec![vec!["m1"]])
                .with_message("m1", "a@x.com", "s", "b"),
        );
        let engine = engine(&store, &provider, config(true, ResultMode::Last));

        engine.handle(&notification("150")).unwrap();

        assert_eq!(
            provider.calls(),
            vec!["history:100", "get:m1", "modify:m1:-UNREAD"]
        );
    }

    #[test]
    fn test_history_expired_fails_but_cursor_advances() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(FakeProvider::expired(store.clone()));
        let engine = engine(&store, &provider, config(false, ResultMode::Last));

        let err = engine.handle(&notification("150")).unwrap_err();

        assert!(err.is_history_expired());
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("150")));
    }

    #[test]
    fn test_credential_failure_is_reported() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(FakeProvider::new(store.clone(), vec![vec!["m1"]]));
        let engine = SyncEngine::new(
            store.clone(),
            Arc::new(FakeTokens { fail: true }),
            provider.clone(),
            config(false, ResultMode::Last),
        );

        let err = engine.handle(&notification("150")).unwrap_err();

        assert!(matches!(err, SyncError::Credential(_)));
        assert!(provider.calls().is_empty());
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("150")));
    }

    #[test]
    fn test_message_fetch_failure_does_not_roll_back() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(FakeProvider::new(store.clone(), vec![vec!["missing"]]));
        let engine = engine(&store, &provider, config(false, ResultMode::Last));

        let err = engine.handle(&notification("150")).unwrap_err();

        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("150")));
    }

    #[test]
    fn test_unusable_message_is_processing_error() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(FakeProvider::new(store.clone(), vec![vec!["broken"]]));
        let engine = engine(&store, &provider, config(false, ResultMode::Last));

        let err = engine.handle(&notification("150")).unwrap_err();

        assert!(matches!(err, SyncError::Processing(_)));
        assert!(err.to_string().contains("broken"));
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("150")));
    }

    /// Cursor store whose backing file cannot be read or written
    struct BrokenStore {
        readable: bool,
    }

    impl CursorStore for BrokenStore {
        fn read(&self) -> Result<Option<HistoryId>, CursorStoreError> {
            if self.readable {
                Ok(Some(HistoryId::new("100")))
            } else {
                Err(CursorStoreError::Io {
                    path: "gmail_history.json".into(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                })
            }
        }

        fn write(&self, _history_id: &HistoryId) -> Result<(), CursorStoreError> {
            Err(CursorStoreError::Io {
                path: "gmail_history.json".into(),
                source: std::io::Error::from(std::io::ErrorKind::StorageFull),
            })
        }
    }

    struct CountingTokens(AtomicUsize);

    impl TokenProvider for CountingTokens {
        fn access_token(&self, _credential: &Credential) -> Result<AccessToken, ProviderError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::new("token", None))
        }
    }

    fn broken_engine(readable: bool) -> (SyncEngine, Arc<CountingTokens>, Arc<FakeProvider>) {
        let tokens = Arc::new(CountingTokens(AtomicUsize::new(0)));
        let provider = Arc::new(FakeProvider::new(
            Arc::new(InMemoryCursorStore::new()),
            vec![vec!["m1"]],
        ));
        let engine = SyncEngine::new(
            Arc::new(BrokenStore { readable }),
            tokens.clone(),
            provider.clone(),
            config(true, ResultMode::Last),
        );
        (engine, tokens, provider)
    }

    #[test]
    fn test_cursor_read_fault_propagates_before_provider_calls() {
        let (engine, tokens, provider) = broken_engine(false);

        let err = engine.handle(&notification("150")).unwrap_err();

        assert!(matches!(
            err,
            SyncError::Storage(CursorStoreError::Io { .. })
        ));
        assert_eq!(tokens.0.load(Ordering::SeqCst), 0);
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn test_cursor_write_fault_propagates_before_provider_calls() {
        let (engine, tokens, provider) = broken_engine(true);

        let err = engine.handle(&notification("150")).unwrap_err();

        assert!(matches!(
            err,
            SyncError::Storage(CursorStoreError::Io { .. })
        ));
        assert_eq!(tokens.0.load(Ordering::SeqCst), 0);
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn test_duplicate_notification_is_harmless() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("150"));
        let provider = Arc::new(FakeProvider::new(store.clone(), Vec::new()));
        let engine = engine(&store, &provider, config(false, ResultMode::Last));

        let outcome = engine.handle(&notification("150")).unwrap();

        assert!(outcome.emails.is_empty());
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("150")));
    }

    #[test]
    fn test_result_mode_from_str() {
        assert_eq!("ALL".parse::<ResultMode>().unwrap(), ResultMode::All);
        assert_eq!(" last ".parse::<ResultMode>().unwrap(), ResultMode::Last);
        assert!("first".parse::<ResultMode>().is_err());
    }

    #[test]
    fn test_is_regression() {
        assert!(is_regression(&HistoryId::new("150"), &HistoryId::new("100")));
        assert!(!is_regression(&HistoryId::new("100"), &HistoryId::new("150")));
        assert!(!is_regression(&HistoryId::new("abc"), &HistoryId::new("1")));
    }
}
