//! The public entry point.
//!
//! [`LlmAdapter`] owns the configuration, the per-provider token buckets, and
//! the failover router. It is `Send + Sync`; share one instance behind an
//! `Arc` across all callers.
//!
//! # Example
//!
//! ```ignore
//! let adapter = LlmAdapter::from_file("llm-router.toml")?;
//! let response = adapter
//!     .chat(vec![ChatMessage::user("Hello")], ChatOptions::default().max_tokens(64))
//!     .await?;
//! println!("{}", response.content().unwrap_or_default());
//! ```

use std::{path::Path, sync::Arc};

use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::{
    api_types::{ChatCompletionResponse, ChatMessage, ChatOptions, ChatRequest},
    config::{ConfigError, RouterConfig},
    observability::{RouterObserver, TracingObserver},
    providers::{RateLimitStatus, RateLimiter, build_providers},
    routing::{FailoverRouter, RouterError},
    secrets::{EnvSecretManager, SecretManager},
};

impl From<ConfigError> for RouterError {
    fn from(error: ConfigError) -> Self {
        RouterError::Configuration(error.to_string())
    }
}

pub struct LlmAdapter {
    config: RouterConfig,
    router: FailoverRouter,
}

impl LlmAdapter {
    /// Build an adapter with the default collaborators: secrets from the
    /// environment, tracing-based observation, and a fresh HTTP client.
    pub fn new(config: RouterConfig) -> Result<Self, RouterError> {
        Self::builder(config).build()
    }

    /// Load configuration from a TOML (or `.json`) file and build an adapter.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RouterError> {
        Self::new(RouterConfig::from_file(path)?)
    }

    pub fn builder(config: RouterConfig) -> LlmAdapterBuilder {
        LlmAdapterBuilder {
            config,
            observer: None,
            secrets: None,
            client: None,
        }
    }

    /// Send a chat completion request through the failover router.
    ///
    /// There is no overall deadline: each network attempt is bounded by
    /// `routing.timeout_ms`, but a call that fails everywhere can take up to
    /// `providers * (max_attempts * timeout + sum of backoff delays)`.
    /// Callers that need a tighter bound should use
    /// [`chat_with_cancellation`](Self::chat_with_cancellation) or drop the
    /// future.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<ChatCompletionResponse, RouterError> {
        self.chat_request(options.into_request(messages)).await
    }

    pub async fn chat_request(
        &self,
        request: ChatRequest,
    ) -> Result<ChatCompletionResponse, RouterError> {
        self.chat_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Like [`chat_request`](Self::chat_request), but stops promptly with
    /// [`RouterError::Cancelled`] once `cancel` fires.
    #[tracing::instrument(
        skip_all,
        fields(messages = request.messages.len(), model = request.model.as_deref().unwrap_or("default"))
    )]
    pub async fn chat_with_cancellation(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<ChatCompletionResponse, RouterError> {
        request
            .validate()
            .map_err(|e| RouterError::Configuration(format!("invalid request: {e}")))?;

        self.router.route_with_cancellation(&request, &cancel).await
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Providers in the order each call tries them.
    pub fn provider_order(&self) -> &[String] {
        self.router.order()
    }

    /// Current state of every provider's token bucket.
    pub fn rate_limit_status(&self) -> Vec<RateLimitStatus> {
        self.router.limiter().status()
    }
}

/// Builder for [`LlmAdapter`] with injectable collaborators.
pub struct LlmAdapterBuilder {
    config: RouterConfig,
    observer: Option<Arc<dyn RouterObserver>>,
    secrets: Option<Arc<dyn SecretManager>>,
    client: Option<reqwest::Client>,
}

impl LlmAdapterBuilder {
    pub fn observer(mut self, observer: Arc<dyn RouterObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn secret_manager(mut self, secrets: Arc<dyn SecretManager>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Validate the configuration and assemble the adapter.
    pub fn build(self) -> Result<LlmAdapter, RouterError> {
        let config = self.config;
        config.validate()?;

        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder().build().map_err(|e| {
                RouterError::Configuration(format!("failed to build HTTP client: {e}"))
            })?,
        };
        let secrets = self
            .secrets
            .unwrap_or_else(|| Arc::new(EnvSecretManager::new()));
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver));

        let limiter = RateLimiter::from_config(&config.providers, &config.rate_limit);
        let providers = build_providers(&config.providers, secrets);
        let router = FailoverRouter::new(
            config.provider_order(),
            providers,
            limiter,
            &config.routing,
            client,
            observer,
        );

        tracing::debug!(
            providers = config.providers.len(),
            order = ?router.order(),
            "Router initialized"
        );

        Ok(LlmAdapter { config, router })
    }
}
