//! Retry with exponential backoff at the provider boundary
//!
//! [`Retrying`] wraps any [`TokenProvider`] or [`MailProvider`] so the sync
//! engine itself stays retry-agnostic.

use log::warn;
use serde::Deserialize;
use std::time::Duration;

use crate::error::ProviderError;
use crate::models::{HistoryId, Message, MessageId};
use crate::provider::{
    AccessToken, Credential, HistoryBatch, MailProvider, TokenProvider, WatchRequest,
    WatchResponse,
};

/// Bounded exponential backoff settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (0-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let delay = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Result<T, ProviderError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation,
                        attempt + 1,
                        attempts,
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay + jitter(JITTER_MAX_MS));
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Provider wrapper applying a [`RetryPolicy`] to every call
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> Retrying<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: TokenProvider> TokenProvider for Retrying<P> {
    fn access_token(&self, credential: &Credential) -> Result<AccessToken, ProviderError> {
        self.policy
            .run("token exchange", || self.inner.access_token(credential))
    }
}

impl<P: MailProvider> MailProvider for Retrying<P> {
    fn list_history(
        &self,
        token: &AccessToken,
        start: &HistoryId,
    ) -> Result<Vec<HistoryBatch>, ProviderError> {
        self.policy
            .run("history.list", || self.inner.list_history(token, start))
    }

    fn get_message(&self, token: &AccessToken, id: &MessageId) -> Result<Message, ProviderError> {
        self.policy
            .run("messages.get", || self.inner.get_message(token, id))
    }

    fn remove_labels(
        &self,
        token: &AccessToken,
        id: &MessageId,
        labels: &[&str],
    ) -> Result<(), ProviderError> {
        self.policy
            .run("messages.modify", || self.inner.remove_labels(token, id, labels))
    }

    fn watch(
        &self,
        token: &AccessToken,
        request: &WatchRequest,
    ) -> Result<WatchResponse, ProviderError> {
        self.policy.run("watch", || self.inner.watch(token, request))
    }
}

/// Extra random delay so concurrent callers do not retry in lockstep
const JITTER_MAX_MS: u64 = 100;

/// Random delay in `[0, max_ms)`, seeded from the std hasher's per-instance keys
fn jitter(max_ms: u64) -> Duration {
    use std::hash::BuildHasher;

    if max_ms == 0 {
        return Duration::ZERO;
    }
    let seed = std::collections::hash_map::RandomState::new().hash_one(max_ms);
    Duration::from_millis(seed % max_ms)
}
