//! Message model representing a fetched Gmail message

use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single header line. Names are not unique (e.g. `Received`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One content part of a message, body still in Gmail's URL-safe base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    pub mime_type: String,
    pub encoded_body: String,
}

impl MessagePart {
    pub fn new(mime_type: impl Into<String>, encoded_body: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            encoded_body: encoded_body.into(),
        }
    }
}

/// A fetched message, read-only once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Gmail message ID
    pub id: MessageId,
    /// Headers in the order the provider returned them
    pub headers: Vec<Header>,
    /// Content parts in the order the provider returned them
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: MessageId) -> MessageBuilder {
        MessageBuilder::new(id)
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    headers: Vec<Header>,
    parts: Vec<MessagePart>,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            headers: Vec::new(),
            parts: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn part(mut self, mime_type: impl Into<String>, encoded_body: impl Into<String>) -> Self {
        self.parts.push(MessagePart::new(mime_type, encoded_body));
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            headers: self.headers,
            parts: self.parts,
        }
    }
}
