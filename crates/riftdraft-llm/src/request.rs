// Request lifecycle: cancellation, retry with backoff, decoding and caching.
//
// Every entry point takes a `CancellationToken`. Once the token fires no
// further attempt is made, any pending backoff sleep is interrupted, and the
// call resolves to `AiError::Aborted`.

use std::sync::Arc;
use std::time::Duration;

use riftdraft_core::cache::ResponseCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{AiClient, GenerateRequest};
use crate::error::AiError;
use crate::parse::{parse_json, parse_validated, Validate};
use crate::retry::RetryPolicy;

/// Where and for how long a response should be cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub key: String,
    pub version: String,
    /// Overrides the cache's default TTL.
    pub ttl: Option<Duration>,
}

impl CacheKey {
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[derive(Clone)]
pub struct RequestManager {
    client: Arc<dyn AiClient>,
    policy: RetryPolicy,
}

impl RequestManager {
    pub fn new(client: Arc<dyn AiClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `request` to completion, retrying transient failures.
    pub async fn send(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AiError> {
        if cancel.is_cancelled() {
            debug!("request cancelled before the first attempt");
            return Err(AiError::Aborted);
        }

        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, max_attempts, "AI request attempt");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "AI request aborted in flight");
                    return Err(AiError::Aborted);
                }
                result = self.client.generate(request) => result,
            };

            // A result that lands after cancellation is discarded.
            if cancel.is_cancelled() {
                return Err(AiError::Aborted);
            }

            let err = match result {
                Ok(text) => {
                    if attempt > 1 {
                        info!(attempt, "AI request succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                warn!(attempt, error = %err, "AI request failed");
                return Err(AiError::NonRetryable(err));
            }
            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %err, "AI request retries exhausted");
                return Err(AiError::ServiceUnavailable {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient AI failure, retrying",
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "AI request aborted during backoff");
                    return Err(AiError::Aborted);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// `send`, then decode the text as `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<T, AiError> {
        let raw = self.send(request, cancel).await?;
        Ok(parse_json(&raw)?)
    }

    /// `send`, then decode and validate the text as `T`.
    pub async fn send_json_validated<T: DeserializeOwned + Validate>(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<T, AiError> {
        let raw = self.send(request, cancel).await?;
        parse_validated(&raw)
    }

    /// Serve from `cache` when a fresh entry of the right version exists,
    /// otherwise call the service and store the validated result.
    pub async fn send_cached<T>(
        &self,
        cache: &ResponseCache,
        key: &CacheKey,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<T, AiError>
    where
        T: Serialize + DeserializeOwned + Validate,
    {
        let ttl = key.ttl.unwrap_or_else(|| cache.ttl());
        if let Some(hit) = cache.get_with_ttl::<T>(&key.key, &key.version, ttl) {
            if hit.validate().is_ok() {
                debug!(key = %key.key, "AI response served from cache");
                return Ok(hit);
            }
            warn!(key = %key.key, "cached AI response failed validation; refetching");
        }

        let value: T = self.send_json_validated(request, cancel).await?;
        if let Err(e) = cache.put(&key.key, &value, &key.version) {
            warn!(key = %key.key, error = %e, "failed to cache AI response");
        }
        Ok(value)
    }
}
