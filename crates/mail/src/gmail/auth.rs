//! Gmail OAuth2 refresh-token exchange
//!
//! The deployment holds a long-lived refresh token for the watched
//! mailbox; every operation that needs Gmail access exchanges it for a
//! fresh access token. Uses synchronous HTTP (ureq) to be executor-agnostic.

use chrono::{Duration, Utc};
use log::debug;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::provider::{AccessToken, Credential, TokenProvider};

const OPERATION: &str = "token exchange";

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    #[allow(dead_code)]
    token_type: Option<String>,
}

/// [`TokenProvider`] backed by Google's OAuth2 token endpoint
#[derive(Debug, Clone)]
pub struct RefreshTokenAuth {
    token_url: String,
}

impl Default for RefreshTokenAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshTokenAuth {
    /// Google OAuth2 token endpoint
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    pub fn new() -> Self {
        Self {
            token_url: Self::TOKEN_URL.to_string(),
        }
    }

    /// Use a different token endpoint
    pub fn with_token_url(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
        }
    }
}

impl TokenProvider for RefreshTokenAuth {
    fn access_token(&self, credential: &Credential) -> Result<AccessToken, ProviderError> {
        debug!("Exchanging refresh token for client {}", credential.client_id);

        let mut response = ureq::post(&self.token_url)
            .send_form([
                ("client_id", credential.client_id.as_str()),
                ("client_secret", credential.client_secret.as_str()),
                ("refresh_token", credential.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .map_err(|e| ProviderError::from_ureq(OPERATION, e))?;

        let token: TokenResponse =
            response
                .body_mut()
                .read_json()
                .map_err(|e| ProviderError::InvalidResponse {
                    operation: OPERATION,
                    reason: e.to_string(),
                })?;

        let secret = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                operation: OPERATION,
                reason: "no access_token in response".to_string(),
            })?;

        let expires_at = token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        Ok(AccessToken::new(secret, expires_at))
    }
}
