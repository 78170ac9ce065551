//! Per-provider retry with exponential backoff.
//!
//! Attempts are strictly sequential. Between attempts the controller sleeps
//! for the backoff delay; the sleep and every in-flight attempt race against
//! the caller's cancellation token, so a cancelled request stops promptly
//! instead of finishing its retry schedule.

use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RetryConfig;

/// Delay before the retry that follows failed attempt `attempt` (0-indexed):
/// `base * 2^attempt`, capped at `max`. Saturates instead of overflowing.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}

/// Outcome of a retried operation that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The cancellation token fired before an attempt completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The last attempt's error: either non-retryable, or attempts exhausted.
    #[error(transparent)]
    Operation(E),
}

/// Execute an async operation with retry logic.
///
/// `operation` receives the 0-indexed attempt number and is invoked at most
/// `config.max_attempts` times. Errors for which `is_retryable` returns false
/// are returned immediately without sleeping.
///
/// # Example
///
/// ```ignore
/// let result = with_retry(
///     &retry_config,
///     "openai",
///     &cancel,
///     |e: &ProviderError| e.kind().is_retryable(),
///     |_attempt| provider.chat_completion(&client, &request, timeout),
/// ).await;
/// ```
pub async fn with_retry<F, Fut, T, E, P>(
    config: &RetryConfig,
    provider: &str,
    cancel: &CancellationToken,
    is_retryable: P,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 0..max_attempts {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            result = operation(attempt) => result,
        };

        match result {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        provider,
                        attempt = attempt + 1,
                        "Request succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(error) => {
                if is_retryable(&error) && attempt + 1 < max_attempts {
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        provider,
                        error = %error,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis(),
                        "Retryable error, will retry after delay"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }

                if attempt > 0 {
                    warn!(
                        provider,
                        error = %error,
                        attempts = attempt + 1,
                        "Request failed after all retry attempts"
                    );
                }

                return Err(RetryError::Operation(error));
            }
        }
    }

    unreachable!("max_attempts is at least 1 so the loop always returns")
}
