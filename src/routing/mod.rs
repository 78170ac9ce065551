//! Failover routing across providers.
//!
//! For each call the router walks providers in a fixed order:
//! 1. Ask the provider's token bucket for admission. A rejected provider is
//!    skipped without a network call and without consuming a retry attempt.
//! 2. Run the retry controller against the admitted provider.
//! 3. Return the first success; otherwise remember the failure and move on.
//!
//! Configuration errors (such as a missing credential) and cancellation stop
//! the walk immediately. When every provider has failed or been skipped the
//! call fails with [`RouterError::AllProvidersFailed`], carrying the most
//! recent error and a per-provider summary.

use std::{collections::HashMap, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    api_types::{ChatCompletionResponse, ChatRequest},
    config::{RetryConfig, RoutingConfig},
    observability::{AttemptOutcome, RouterObserver},
    providers::{
        ErrorKind, Provider, ProviderError, RateLimiter,
        retry::{RetryError, with_retry},
    },
};

/// Summary of one provider's failure within a routed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Error surfaced by the router to its caller.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("provider '{provider}' is rate limited")]
    RateLimited { provider: String },

    #[error("provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("all providers failed; last error: {last_error}")]
    AllProvidersFailed {
        last_error: Box<RouterError>,
        failures: Vec<ProviderFailure>,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl RouterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Provider { source, .. } => source.kind(),
            Self::AllProvidersFailed { .. } => ErrorKind::AllProvidersFailed,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Most recent underlying error of an aggregate failure, or `self`.
    pub fn last_error(&self) -> &RouterError {
        match self {
            Self::AllProvidersFailed { last_error, .. } => last_error,
            other => other,
        }
    }
}

/// Walks providers in order until one succeeds.
pub struct FailoverRouter {
    order: Vec<String>,
    providers: HashMap<String, Arc<dyn Provider>>,
    limiter: RateLimiter,
    retry: RetryConfig,
    timeout: Duration,
    client: reqwest::Client,
    observer: Arc<dyn RouterObserver>,
}

impl FailoverRouter {
    /// `order` is used verbatim; every name in it must have an entry in
    /// `providers`.
    pub fn new(
        order: Vec<String>,
        providers: HashMap<String, Arc<dyn Provider>>,
        limiter: RateLimiter,
        routing: &RoutingConfig,
        client: reqwest::Client,
        observer: Arc<dyn RouterObserver>,
    ) -> Self {
        Self {
            order,
            providers,
            limiter,
            retry: routing.retry.clone(),
            timeout: routing.timeout(),
            client,
            observer,
        }
    }

    /// Providers in the order they are tried.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn route(&self, request: &ChatRequest) -> Result<ChatCompletionResponse, RouterError> {
        self.route_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Route a request, abandoning in-flight attempts and backoff sleeps as
    /// soon as `cancel` fires.
    pub async fn route_with_cancellation(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletionResponse, RouterError> {
        let mut failures = Vec::new();
        let mut last_error = None;

        for name in &self.order {
            if cancel.is_cancelled() {
                return Err(RouterError::Cancelled);
            }

            let Some(provider) = self.providers.get(name) else {
                return Err(RouterError::Configuration(format!(
                    "unknown provider '{name}'"
                )));
            };

            if !self.limiter.allow(name) {
                warn!(provider = %name, "Provider rate limited, skipping");
                self.observer
                    .record_attempt(name, AttemptOutcome::RateLimited);
                failures.push(ProviderFailure {
                    provider: name.clone(),
                    kind: ErrorKind::RateLimited,
                    message: "rate limited".to_string(),
                });
                last_error = Some(RouterError::RateLimited {
                    provider: name.clone(),
                });
                continue;
            }
            debug!(provider = %name, "Provider admitted");

            let result = with_retry(
                &self.retry,
                name,
                cancel,
                |e: &ProviderError| e.kind().is_retryable(),
                |_attempt| self.attempt(provider.as_ref(), request),
            )
            .await;

            match result {
                Ok(response) => {
                    if !failures.is_empty() {
                        debug!(
                            provider = %name,
                            skipped = failures.len(),
                            "Request served after failover"
                        );
                    }
                    return Ok(response);
                }
                Err(RetryError::Cancelled) => {
                    self.observer.record_attempt(name, AttemptOutcome::Cancelled);
                    return Err(RouterError::Cancelled);
                }
                Err(RetryError::Operation(error)) if error.kind() == ErrorKind::Configuration => {
                    return Err(RouterError::Configuration(format!(
                        "provider '{name}': {error}"
                    )));
                }
                Err(RetryError::Operation(error)) => {
                    warn!(
                        provider = %name,
                        error = %error,
                        "Provider failed, trying next provider"
                    );
                    failures.push(ProviderFailure {
                        provider: name.clone(),
                        kind: error.kind(),
                        message: error.to_string(),
                    });
                    last_error = Some(RouterError::Provider {
                        provider: name.clone(),
                        source: error,
                    });
                }
            }
        }

        match last_error {
            Some(last_error) => Err(RouterError::AllProvidersFailed {
                last_error: Box::new(last_error),
                failures,
            }),
            None => Err(RouterError::Configuration(
                "no providers configured for routing".into(),
            )),
        }
    }

    /// One network attempt, reported to the observer.
    async fn attempt(
        &self,
        provider: &dyn Provider,
        request: &ChatRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        let start = Instant::now();
        let result = provider
            .chat_completion(&self.client, request, self.timeout)
            .await;
        self.observer.record_latency(provider.name(), start.elapsed());

        let outcome = match &result {
            Ok(_) => AttemptOutcome::Success,
            Err(e) => e.kind().into(),
        };
        self.observer.record_attempt(provider.name(), outcome);
        result
    }
}
