// Error taxonomy for calls to the AI service.
//
// `CallError` classifies one attempt. `AiError` is what a whole request
// lifecycle (retries, cancellation, parsing) resolves to.

use thiserror::Error;

/// Failure of a single attempt against the AI service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("rate limited by the AI service")]
    RateLimited,

    #[error("AI service unavailable (HTTP {0})")]
    ServiceUnavailable(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("request rejected as malformed: {0}")]
    BadRequest(String),

    #[error("AI service rejected the credentials")]
    Unauthorized,

    #[error("AI model or endpoint not found")]
    NotFound,

    #[error("AI service returned HTTP {0}")]
    Status(u16),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("AI client is not configured")]
    NotConfigured,
}

impl CallError {
    /// Map a non-success HTTP status to an error class.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => CallError::RateLimited,
            500 | 502 | 503 | 504 => CallError::ServiceUnavailable(status),
            400 => CallError::BadRequest(summarize_body(body)),
            401 | 403 => CallError::Unauthorized,
            404 => CallError::NotFound,
            other => CallError::Status(other),
        }
    }

    /// Rate limits, server unavailability and network failures are expected
    /// to clear up on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CallError::RateLimited | CallError::ServiceUnavailable(_) | CallError::Network(_)
        )
    }
}

/// Pull `error.message` out of a JSON error body, falling back to a
/// truncated copy of the raw body.
fn summarize_body(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string));
    match message {
        Some(m) => m,
        None => body.chars().take(200).collect(),
    }
}

/// Outcome of a request lifecycle that did not produce a usable value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    /// Cancelled by the caller. Not a failure.
    #[error("request aborted")]
    Aborted,

    #[error("AI service unavailable after {attempts} attempts: {last}")]
    ServiceUnavailable { attempts: u32, last: CallError },

    #[error("AI request failed: {0}")]
    NonRetryable(CallError),

    #[error("AI returned an empty response")]
    EmptyResponse,

    #[error("AI response was not valid JSON: {reason}")]
    InvalidFormat { reason: String },

    #[error("AI response failed validation: {0}")]
    Validation(String),
}

impl AiError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, AiError::Aborted)
    }

    /// Text suitable for a transient notification. `None` means nothing
    /// should be shown.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            AiError::Aborted => None,
            AiError::ServiceUnavailable { .. } => {
                Some("The AI service is busy right now. Please try again later.")
            }
            AiError::NonRetryable(CallError::NotConfigured) => {
                Some("AI features are not configured. Add an API key to enable them.")
            }
            AiError::NonRetryable(_)
            | AiError::EmptyResponse
            | AiError::InvalidFormat { .. }
            | AiError::Validation(_) => {
                Some("The AI request could not be completed. Please report this if it persists.")
            }
        }
    }
}
