//! Gmail API integration
//!
//! This module provides:
//! - Refresh-token exchange against Google's OAuth2 endpoint
//! - Gmail API client for history, messages, labels and watch
//! - Response normalization to domain models

mod auth;
mod client;
mod normalize;

pub use auth::RefreshTokenAuth;
pub use client::GmailClient;
pub use normalize::normalize_message;

/// Gmail API wire types
pub mod api {
    use serde::{Deserialize, Serialize};

    use crate::models::HistoryId;
    use crate::provider::WatchRequest;

    /// Response from users.history.list
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryResponse {
        pub history: Option<Vec<HistoryRecord>>,
        pub next_page_token: Option<String>,
        pub history_id: Option<String>,
    }

    /// One change-log entry
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryRecord {
        pub id: Option<String>,
        pub messages_added: Option<Vec<HistoryMessageAdded>>,
    }

    /// A message-added event
    #[derive(Debug, Deserialize)]
    pub struct HistoryMessageAdded {
        pub message: MessageRef,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Full message from Gmail API
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: Option<String>,
        pub label_ids: Option<Vec<String>>,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload containing headers and body
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
        pub mime_type: Option<String>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (URL-safe base64 encoded)
    #[derive(Debug, Deserialize)]
    pub struct MessageBody {
        pub size: Option<u32>,
        pub data: Option<String>,
    }

    /// Message part (for multipart messages)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Body of users.messages.modify
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyMessageRequest<'a> {
        pub add_label_ids: &'a [&'a str],
        pub remove_label_ids: &'a [&'a str],
    }

    /// Body of users.watch
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WatchRequestBody<'a> {
        pub topic_name: &'a str,
        pub label_ids: &'a [String],
        pub label_filter_action: &'a str,
    }

    impl<'a> From<&'a WatchRequest> for WatchRequestBody<'a> {
        fn from(request: &'a WatchRequest) -> Self {
            Self {
                topic_name: &request.topic_name,
                label_ids: &request.label_ids,
                label_filter_action: "include",
            }
        }
    }

    /// Response from users.watch
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WatchResponseBody {
        pub history_id: HistoryId,
        /// Milliseconds since epoch, as a decimal string
        pub expiration: Option<String>,
    }
}
