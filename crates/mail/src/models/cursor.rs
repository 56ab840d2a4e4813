//! Cursor (history marker) tracking for incremental Gmail sync

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Gmail historyId: an opaque, provider-assigned pointer into the
/// mailbox change log.
///
/// Gmail publishes it as a JSON number in push notifications and as a
/// string in REST responses, so both forms are accepted on input. It is
/// always persisted as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HistoryId(String);

impl HistoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HistoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for HistoryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        let id = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().to_string(),
            Raw::Number(n) => n.to_string(),
        };
        if id.is_empty() {
            return Err(serde::de::Error::custom("historyId is empty"));
        }
        Ok(Self(id))
    }
}

/// On-disk layout of the cursor document: `{ "historyId": "..." }`
///
/// Only one record exists per deployment; it is rewritten wholesale on
/// every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorRecord {
    #[serde(default)]
    pub history_id: Option<HistoryId>,
}

impl CursorRecord {
    pub fn new(history_id: HistoryId) -> Self {
        Self {
            history_id: Some(history_id),
        }
    }
}
