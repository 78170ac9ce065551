//! Provider error handling.
//!
//! Every failure the router can observe is classified into an [`ErrorKind`].
//! The kind decides what happens next: timeouts and provider failures are
//! retried on the same provider, rate-limited providers are skipped,
//! configuration errors and cancellation stop the call outright.

use std::time::Duration;

use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Error taxonomy shared by every layer of the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown provider, unsupported type, missing credential, or malformed request.
    Configuration,
    /// Network deadline exceeded on a single attempt.
    Timeout,
    /// Any other transport, HTTP, or parse failure on a single attempt.
    ProviderFailure,
    /// The provider's token bucket rejected the attempt.
    RateLimited,
    /// Every provider in the routing order failed or was rate limited.
    AllProvidersFailed,
    /// The caller cancelled the request.
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Timeout => "timeout",
            Self::ProviderFailure => "provider_failure",
            Self::RateLimited => "rate_limited",
            Self::AllProvidersFailed => "all_providers_failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether another attempt on the same provider may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::ProviderFailure)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single provider invocation.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("provider configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Classify a transport error, separating deadline expiry from other failures.
    ///
    /// A request that could not be built (bad header name or value, bad
    /// URL) will fail the same way on every attempt, so it is a
    /// configuration error rather than a provider failure.
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else if error.is_builder() {
            Self::Configuration(format!("failed to build request: {error}"))
        } else {
            Self::Request(error)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Request(_) | Self::Status { .. } | Self::InvalidResponse(_) => {
                ErrorKind::ProviderFailure
            }
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Extract a human-readable message from a provider error body.
///
/// OpenAI-compatible servers return `{"error": {"message": "..."}}`; some
/// return `{"error": "..."}` or `{"message": "..."}`. Falls back to the raw
/// body, truncated.
pub fn error_message_from_body(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 512;

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let message = value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| value.get("error").and_then(Value::as_str))
            .or_else(|| value.get("message").and_then(Value::as_str));
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::from("(empty body)");
    }
    trimmed.chars().take(MAX_BODY_CHARS).collect()
}
