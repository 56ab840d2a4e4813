//! Watch registration
//!
//! Gmail only pushes notifications while a watch is active, and a watch
//! lapses after about a week, so hosts call [`WatchRegistrar::register`]
//! at setup and periodically afterwards.

use log::info;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::SyncError;
use crate::provider::{
    Credential, MailProvider, TokenProvider, WatchRequest, WatchResponse,
};
use crate::storage::CursorStore;

/// Label watched when none is configured
pub const DEFAULT_WATCH_LABEL: &str = "INBOX";

/// Subscribes the mailbox to push notifications and seeds the cursor
pub struct WatchRegistrar {
    store: Arc<dyn CursorStore>,
    tokens: Arc<dyn TokenProvider>,
    provider: Arc<dyn MailProvider>,
    credential: Credential,
    label_ids: Vec<String>,
    mailbox_lock: Arc<Mutex<()>>,
}

impl WatchRegistrar {
    pub(crate) fn new(
        store: Arc<dyn CursorStore>,
        tokens: Arc<dyn TokenProvider>,
        provider: Arc<dyn MailProvider>,
        credential: Credential,
        label_ids: Vec<String>,
        mailbox_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            tokens,
            provider,
            credential,
            label_ids,
            mailbox_lock,
        }
    }

    /// Register a watch publishing to `topic` and seed the cursor with the
    /// history ID the provider returns.
    ///
    /// On failure the stored cursor is left untouched.
    pub fn register(&self, topic: &str) -> Result<WatchResponse, SyncError> {
        let token = self
            .tokens
            .access_token(&self.credential)
            .map_err(SyncError::Credential)?;

        let request = WatchRequest {
            topic_name: topic.to_string(),
            label_ids: self.label_ids.clone(),
        };

        let response = self
            .provider
            .watch(&token, &request)
            .map_err(SyncError::Fetch)?;

        {
            let _guard = self
                .mailbox_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.store.write(&response.history_id)?;
        }

        match response.expiration {
            Some(expiration) => info!(
                "Watching {:?} via {}; cursor seeded at {}, expires {}",
                self.label_ids, topic, response.history_id, expiration
            ),
            None => info!(
                "Watching {:?} via {}; cursor seeded at {}",
                self.label_ids, topic, response.history_id
            ),
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::{HistoryId, Message, MessageId};
    use crate::provider::{AccessToken, HistoryBatch};
    use crate::storage::InMemoryCursorStore;

    struct FakeWatch {
        fail: bool,
        requests: Mutex<Vec<WatchRequest>>,
    }

    impl MailProvider for FakeWatch {
        fn list_history(
            &self,
            _token: &AccessToken,
            _start: &HistoryId,
        ) -> Result<Vec<HistoryBatch>, ProviderError> {
            unreachable!()
        }

        fn get_message(&self, _token: &AccessToken, _id: &MessageId) -> Result<Message, ProviderError> {
            unreachable!()
        }

        fn remove_labels(
            &self,
            _token: &AccessToken,
            _id: &MessageId,
            _labels: &[&str],
        ) -> Result<(), ProviderError> {
            unreachable!()
        }

        fn watch(
            &self,
            _token: &AccessToken,
            request: &WatchRequest,
        ) -> Result<WatchResponse, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(ProviderError::Status {
                    operation: "watch",
                    status: 403,
                });
            }
            Ok(WatchResponse {
                history_id: HistoryId::new("500"),
                expiration: None,
            })
        }
    }

    struct StaticToken;

    impl TokenProvider for StaticToken {
        fn access_token(&self, _credential: &Credential) -> Result<AccessToken, ProviderError> {
            Ok(AccessToken::new("token", None))
        }
    }

    fn registrar(store: &Arc<InMemoryCursorStore>, provider: &Arc<FakeWatch>) -> WatchRegistrar {
        WatchRegistrar::new(
            store.clone(),
            Arc::new(StaticToken),
            provider.clone(),
            Credential {
                client_id: "id".into(),
                client_secret: "secret".into(),
                refresh_token: "refresh".into(),
            },
            vec![DEFAULT_WATCH_LABEL.to_string()],
            Arc::new(Mutex::new(())),
        )
    }

    #[test]
    fn test_register_seeds_cursor() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(FakeWatch {
            fail: false,
            requests: Mutex::new(Vec::new()),
        });

        let response = registrar(&store, &provider)
            .register("projects/demo/topics/gmail")
            .unwrap();

        assert_eq!(response.history_id, HistoryId::new("500"));
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("500")));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].topic_name, "projects/demo/topics/gmail");
        assert_eq!(requests[0].label_ids, vec!["INBOX".to_string()]);
    }

    #[test]
    fn test_failed_register_leaves_cursor() {
        let store = Arc::new(InMemoryCursorStore::with_cursor("100"));
        let provider = Arc::new(FakeWatch {
            fail: true,
            requests: Mutex::new(Vec::new()),
        });

        let result = registrar(&store, &provider).register("projects/demo/topics/gmail");

        assert!(matches!(result, Err(SyncError::Fetch(_))));
        assert_eq!(store.read().unwrap(), Some(HistoryId::new("100")));
    }
}
