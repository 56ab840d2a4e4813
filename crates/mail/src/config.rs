//! Configuration loading for the notification reader
//!
//! Supports loading settings from (in order of priority):
//! 1. JSON file (~/.config/pushmail/settings.json, or an explicit path)
//! 2. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::provider::Credential;
use crate::retry::RetryPolicy;
use crate::storage::JsonCursorStore;
use crate::sync::{DEFAULT_WATCH_LABEL, ResultMode, SyncConfig};

/// Settings filename in the pushmail config directory
const SETTINGS_FILE: &str = "settings.json";

/// Environment variable names
pub mod env {
    pub const CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
    pub const REFRESH_TOKEN: &str = "REFRESH_TOKEN";
    pub const SUBSCRIPTION_NAME: &str = "EMAIL_READ_SUBSCRIPTION_NAME";
    pub const TOPIC_NAME: &str = "EMAIL_READ_TOPIC_NAME";
    pub const MARK_AS_READ: &str = "EMAIL_MARK_AS_READ";
    pub const CURSOR_PATH: &str = "PUSHMAIL_CURSOR_PATH";
    pub const RESULT_MODE: &str = "PUSHMAIL_RESULT_MODE";
}

/// Everything the reader needs, supplied from outside the core
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    /// Refresh token of the mailbox being read
    pub refresh_token: String,
    /// Remove UNREAD from each processed message
    #[serde(default)]
    pub mark_as_read: bool,
    /// Full Pub/Sub subscription name pushes must arrive through
    pub subscription_name: String,
    /// Pub/Sub topic used when registering the watch
    #[serde(default)]
    pub topic_name: Option<String>,
    #[serde(default = "default_watch_label")]
    pub watch_label: String,
    #[serde(default)]
    pub result_mode: ResultMode,
    /// Cursor file; defaults to ~/.config/pushmail/gmail_history.json
    #[serde(default)]
    pub cursor_path: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_watch_label() -> String {
    DEFAULT_WATCH_LABEL.to_string()
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("mark_as_read", &self.mark_as_read)
            .field("subscription_name", &self.subscription_name)
            .field("topic_name", &self.topic_name)
            .field("watch_label", &self.watch_label)
            .field("result_mode", &self.result_mode)
            .field("cursor_path", &self.cursor_path)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Settings {
    /// Load settings from the default file, falling back to the environment
    pub fn load() -> Result<Self> {
        if config::config_exists(SETTINGS_FILE) {
            let settings: Self = config::load_json(SETTINGS_FILE)?;
            return settings.validated();
        }

        Self::from_env()
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings: Self = config::load_json_file(path)?;
        settings.validated()
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).context("Failed to parse settings JSON")?;
        settings.validated()
    }

    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (environment-shaped)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require =
            |key: &str| get(key).with_context(|| format!("{key} environment variable not set"));

        let mark_as_read = get(env::MARK_AS_READ)
            .map(|v| parse_bool(&v))
            .transpose()
            .with_context(|| format!("{} must be a boolean", env::MARK_AS_READ))?
            .unwrap_or(false);

        let result_mode = get(env::RESULT_MODE)
            .map(|v| v.parse::<ResultMode>())
            .transpose()
            .map_err(anyhow::Error::msg)?
            .unwrap_or_default();

        let settings = Self {
            client_id: require(env::CLIENT_ID)?,
            client_secret: require(env::CLIENT_SECRET)?,
            refresh_token: require(env::REFRESH_TOKEN)?,
            mark_as_read,
            subscription_name: require(env::SUBSCRIPTION_NAME)?,
            topic_name: get(env::TOPIC_NAME),
            watch_label: default_watch_label(),
            result_mode,
            cursor_path: get(env::CURSOR_PATH).map(PathBuf::from),
            retry: RetryPolicy::default(),
        };
        settings.validated()
    }

    /// Get the default settings file path (~/.config/pushmail/settings.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }

    fn validated(self) -> Result<Self> {
        for (name, value) in [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("refresh_token", &self.refresh_token),
            ("subscription_name", &self.subscription_name),
            ("watch_label", &self.watch_label),
        ] {
            anyhow::ensure!(!value.trim().is_empty(), "setting '{name}' must not be empty");
        }
        Ok(self)
    }

    pub fn credential(&self) -> Credential {
        Credential {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            credential: self.credential(),
            mark_as_read: self.mark_as_read,
            result_mode: self.result_mode,
        }
    }

    /// Resolved cursor file location
    pub fn cursor_path(&self) -> Result<PathBuf> {
        match &self.cursor_path {
            Some(path) => Ok(path.clone()),
            None => JsonCursorStore::default_path().context("Could not determine config directory"),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("invalid boolean '{other}'"),
    }
}
