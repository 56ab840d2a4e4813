//! Gmail API HTTP client
//!
//! Implements [`MailProvider`] over the Gmail REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use chrono::{TimeZone, Utc};
use log::debug;

use super::api::{
    GmailMessage, HistoryResponse, ModifyMessageRequest, WatchRequestBody, WatchResponseBody,
};
use super::normalize_message;
use crate::error::ProviderError;
use crate::models::{HistoryId, Message, MessageId};
use crate::provider::{AccessToken, HistoryBatch, MailProvider, WatchRequest, WatchResponse};

/// Gmail API client for the authenticated user's mailbox
#[derive(Debug, Clone)]
pub struct GmailClient {
    base_url: String,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new() -> Self {
        Self {
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Create a client talking to a different API root
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn bearer(token: &AccessToken) -> String {
        format!("Bearer {}", token.secret())
    }

    /// Fetch one page of history since `start_history_id`
    ///
    /// # Errors
    /// Returns `ProviderError::HistoryExpired` if the history ID is too old (404 from Gmail)
    pub fn list_history_page(
        &self,
        token: &AccessToken,
        start_history_id: &str,
        page_token: Option<&str>,
    ) -> Result<HistoryResponse, ProviderError> {
        const OPERATION: &str = "history.list";

        let mut url = format!(
            "{}/users/me/history?startHistoryId={}&historyTypes=messageAdded",
            self.base_url,
            urlencoding::encode(start_history_id)
        );

        if let Some(page) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(page)));
        }

        let response = ureq::get(&url)
            .header("Authorization", &Self::bearer(token))
            .call();

        match response {
            Ok(mut resp) => resp
                .body_mut()
                .read_json()
                .map_err(|e| ProviderError::InvalidResponse {
                    operation: OPERATION,
                    reason: e.to_string(),
                }),
            // History ID expired or invalid
            Err(ureq::Error::StatusCode(404)) => Err(ProviderError::HistoryExpired),
            Err(e) => Err(ProviderError::from_ureq(OPERATION, e)),
        }
    }

    /// Fetch the raw Gmail representation of a message
    pub fn get_raw_message(
        &self,
        token: &AccessToken,
        id: &MessageId,
    ) -> Result<GmailMessage, ProviderError> {
        const OPERATION: &str = "messages.get";

        let url = format!(
            "{}/users/me/messages/{}?format=full",
            self.base_url,
            urlencoding::encode(id.as_str())
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &Self::bearer(token))
            .call()
            .map_err(|e| ProviderError::from_ureq(OPERATION, e))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::InvalidResponse {
                operation: OPERATION,
                reason: e.to_string(),
            })
    }
}

impl MailProvider for GmailClient {
    fn list_history(
        &self,
        token: &AccessToken,
        start: &HistoryId,
    ) -> Result<Vec<HistoryBatch>, ProviderError> {
        let mut batches = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self.list_history_page(token, start.as_str(), page_token.as_deref())?;

            for record in response.history.unwrap_or_default() {
                let messages_added = record
                    .messages_added
                    .unwrap_or_default()
                    .into_iter()
                    .map(|added| MessageId::new(added.message.id))
                    .collect();
                batches.push(HistoryBatch { messages_added });
            }

            match response.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!("history.list from {} returned {} records", start, batches.len());
        Ok(batches)
    }

    fn get_message(&self, token: &AccessToken, id: &MessageId) -> Result<Message, ProviderError> {
        let raw = self.get_raw_message(token, id)?;
        normalize_message(raw)
    }

    fn remove_labels(
        &self,
        token: &AccessToken,
        id: &MessageId,
        labels: &[&str],
    ) -> Result<(), ProviderError> {
        const OPERATION: &str = "messages.modify";

        let url = format!(
            "{}/users/me/messages/{}/modify",
            self.base_url,
            urlencoding::encode(id.as_str())
        );

        ureq::post(&url)
            .header("Authorization", &Self::bearer(token))
            .send_json(&ModifyMessageRequest {
                add_label_ids: &[],
                remove_label_ids: labels,
            })
            .map_err(|e| ProviderError::from_ureq(OPERATION, e))?;

        Ok(())
    }

    fn watch(
        &self,
        token: &AccessToken,
        request: &WatchRequest,
    ) -> Result<WatchResponse, ProviderError> {
        const OPERATION: &str = "watch";

        let url = format!("{}/users/me/watch", self.base_url);

        let mut response = ureq::post(&url)
            .header("Authorization", &Self::bearer(token))
            .send_json(WatchRequestBody::from(request))
            .map_err(|e| ProviderError::from_ureq(OPERATION, e))?;

        let body: WatchResponseBody =
            response
                .body_mut()
                .read_json()
                .map_err(|e| ProviderError::InvalidResponse {
                    operation: OPERATION,
                    reason: e.to_string(),
                })?;

        let expiration = body
            .expiration
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        Ok(WatchResponse {
            history_id: body.history_id,
            expiration,
        })
    }
}
