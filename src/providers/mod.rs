//! Provider invocation.
//!
//! A [`Provider`] performs exactly one network call to one backend and
//! returns a normalized [`ChatCompletionResponse`]. Retry, rate limiting, and
//! failover live above this layer.
//!
//! All providers share one `reqwest::Client`. The client is created once by
//! the adapter; reqwest keeps a connection pool per host, so each provider
//! endpoint gets its own pool.

pub mod error;
pub mod generic_http;
pub mod open_ai;
pub mod rate_limit;
pub mod response;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_utils;

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
pub use error::{ErrorKind, ProviderError};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
pub use rate_limit::{RateLimitStatus, RateLimiter, TokenBucket};
use serde_json::{Map, Value};

use crate::{
    api_types::{ChatCompletionResponse, ChatRequest},
    config::{ProviderConfig, ProviderType, ProvidersConfig},
    secrets::SecretManager,
};

#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique provider name from configuration.
    fn name(&self) -> &str;

    fn provider_type(&self) -> ProviderType;

    /// Send one chat completion request. `timeout` bounds the whole attempt,
    /// from connect through reading the body.
    async fn chat_completion(
        &self,
        client: &reqwest::Client,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<ChatCompletionResponse, ProviderError>;
}

/// Instantiate the provider implementation matching a config entry.
pub fn build_provider(
    name: &str,
    config: &ProviderConfig,
    secrets: Arc<dyn SecretManager>,
) -> Arc<dyn Provider> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Arc::new(
            open_ai::OpenAICompatibleProvider::from_config(name, openai_config, secrets),
        ),
        ProviderConfig::Http(http_config) => Arc::new(
            generic_http::GenericHttpProvider::from_config(name, http_config),
        ),
    }
}

/// Instantiate every configured provider, keyed by name.
pub fn build_providers(
    config: &ProvidersConfig,
    secrets: Arc<dyn SecretManager>,
) -> HashMap<String, Arc<dyn Provider>> {
    config
        .iter()
        .map(|(name, provider)| {
            (
                name.to_string(),
                build_provider(name, provider, secrets.clone()),
            )
        })
        .collect()
}

/// Build the JSON body for a chat completion request.
///
/// Precedence, lowest first: `default_model`, the provider's fixed `request`
/// fields, then the call's own fields (model, temperature, max_tokens, extra).
/// When no model resolves the field is omitted.
pub(crate) fn build_payload(
    request: &ChatRequest,
    overrides: &Map<String, Value>,
    default_model: Option<&str>,
) -> Result<Value, ProviderError> {
    let mut payload = Map::new();

    if let Some(model) = default_model {
        payload.insert("model".into(), Value::String(model.to_string()));
    }

    let messages = serde_json::to_value(&request.messages)
        .map_err(|e| ProviderError::Configuration(format!("failed to encode messages: {e}")))?;
    payload.insert("messages".into(), messages);

    for (key, value) in overrides {
        payload.insert(key.clone(), value.clone());
    }

    if let Some(model) = &request.model {
        payload.insert("model".into(), Value::String(model.clone()));
    }
    if let Some(temperature) = request.temperature {
        payload.insert("temperature".into(), Value::from(temperature));
    }
    if let Some(max_tokens) = request.max_tokens {
        payload.insert("max_tokens".into(), Value::from(max_tokens));
    }
    for (key, value) in &request.extra {
        payload.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(payload))
}

/// POST a payload to `{base_url}/chat/completions` and normalize the reply.
pub(crate) async fn post_chat_completion(
    client: &reqwest::Client,
    provider: &str,
    base_url: &str,
    bearer: Option<&str>,
    headers: &HashMap<String, String>,
    payload: &Value,
    timeout: Duration,
) -> Result<ChatCompletionResponse, ProviderError> {
    let url = format!("{base_url}/chat/completions");
    let body = serde_json::to_vec(payload)
        .map_err(|e| ProviderError::Configuration(format!("failed to encode payload: {e}")))?;

    let request = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .timeout(timeout);
    let request = match bearer {
        Some(credential) => request.header(AUTHORIZATION, format!("Bearer {credential}")),
        None => request,
    };
    let request = headers.iter().fold(request, |req, (key, value)| {
        req.header(key.as_str(), value.as_str())
    });

    let response = request
        .body(body)
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(e, timeout))?;
    let response = check_response(response, timeout).await?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProviderError::from_reqwest(e, timeout))?;
    let json: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ProviderError::InvalidResponse(format!("response is not JSON: {e}")))?;

    response::normalize_chat_response(provider, json)
}

/// Turn a non-2xx response into a [`ProviderError::Status`].
async fn check_response(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) if e.is_timeout() => return Err(ProviderError::Timeout(timeout)),
        Err(_) => String::new(),
    };

    Err(ProviderError::Status {
        status,
        message: error::error_message_from_body(&body),
    })
}
