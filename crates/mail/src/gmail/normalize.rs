//! Gmail API response normalization
//!
//! Converts Gmail API messages to the domain [`Message`]: headers in
//! order, and the leaf content parts in document order.

use super::api::{GmailMessage, MessagePart as ApiPart, MessagePayload};
use crate::error::ProviderError;
use crate::models::{Header, Message, MessageId, MessagePart};

/// Normalize a Gmail API message
pub fn normalize_message(gmail_msg: GmailMessage) -> Result<Message, ProviderError> {
    let payload = gmail_msg
        .payload
        .ok_or_else(|| ProviderError::InvalidResponse {
            operation: "messages.get",
            reason: format!("message {} has no payload", gmail_msg.id),
        })?;

    let headers = payload
        .headers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|h| Header::new(&h.name, &h.value))
        .collect();

    Ok(Message {
        id: MessageId::new(gmail_msg.id),
        headers,
        parts: collect_parts(&payload),
    })
}

/// Leaf parts of the payload in document order
///
/// A payload without parts (a single-part message) is its own only part.
fn collect_parts(payload: &MessagePayload) -> Vec<MessagePart> {
    let mut parts = Vec::new();

    match payload.parts.as_deref() {
        Some(children) if !children.is_empty() => flatten_parts(children, &mut parts),
        _ => {
            if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
                parts.push(MessagePart::new(
                    payload.mime_type.as_deref().unwrap_or_default(),
                    data,
                ));
            }
        }
    }

    parts
}

/// Recursively collect leaf parts (multipart containers are descended into)
fn flatten_parts(children: &[ApiPart], out: &mut Vec<MessagePart>) {
    for part in children {
        if let Some(nested) = part.parts.as_deref()
            && !nested.is_empty()
        {
            flatten_parts(nested, out);
            continue;
        }

        let data = part
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .unwrap_or_default();
        out.push(MessagePart::new(
            part.mime_type.as_deref().unwrap_or_default(),
            data,
        ));
    }
}
