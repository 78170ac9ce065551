use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{
    api_types::{ChatCompletionResponse, ChatRequest},
    config::{HttpProviderConfig, ProviderType},
    providers::{Provider, ProviderError, build_payload, post_chat_completion},
};

/// Unauthenticated backend following the `/chat/completions` path convention.
///
/// The reply may be a full chat completion or a bare `{"text": ...}`,
/// `{"output": ...}`, or `{"message": ...}` body; either way it is normalized.
pub struct GenericHttpProvider {
    name: String,
    base_url: String,
    default_model: Option<String>,
    request: Map<String, Value>,
    headers: HashMap<String, String>,
}

impl GenericHttpProvider {
    pub fn from_config(name: &str, config: &HttpProviderConfig) -> Self {
        Self {
            name: name.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.default_model.clone(),
            request: config.request.clone(),
            headers: config.headers.clone(),
        }
    }
}

#[async_trait]
impl Provider for GenericHttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::GenericHttp
    }

    #[tracing::instrument(
        skip(self, client, request),
        fields(
            provider = %self.name,
            operation = "chat_completion",
            model = %request.model.as_deref().unwrap_or("default"),
        )
    )]
    async fn chat_completion(
        &self,
        client: &reqwest::Client,
        request: &ChatRequest,
        timeout: Duration,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        let payload = build_payload(request, &self.request, self.default_model.as_deref())?;

        post_chat_completion(
            client,
            &self.name,
            &self.base_url,
            None,
            &self.headers,
            &payload,
            timeout,
        )
        .await
    }
}
