use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    api_types::{ChatCompletionResponse, ChatRequest},
    config::{OpenAiProviderConfig, ProviderType},
    providers::{Provider, ProviderError, build_payload, post_chat_completion},
    secrets::SecretManager,
};

/// Model used when neither the request nor the provider config names one.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible backend authenticated with a bearer credential.
///
/// The credential is looked up through the [`SecretManager`] on every call,
/// so a rotated key takes effect without rebuilding the provider.
pub struct OpenAICompatibleProvider {
    name: String,
    base_url: String,
    default_model: Option<String>,
    request: serde_json::Map<String, serde_json::Value>,
    headers: HashMap<String, String>,
    credential_key: String,
    secrets: Arc<dyn SecretManager>,
}

impl OpenAICompatibleProvider {
    pub fn from_config(
        name: &str,
        config: &OpenAiProviderConfig,
        secrets: Arc<dyn SecretManager>,
    ) -> Self {
        Self {
            name: name.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.default_model.clone(),
            request: config.request.clone(),
            headers: config.headers.clone(),
            credential_key: config.auth.env.clone(),
            secrets,
        }
    }

    async fn credential(&self) -> Result<String, ProviderError> {
        let credential = self.secrets.get(&self.credential_key).await.map_err(|e| {
            ProviderError::Configuration(format!(
                "failed to read credential '{}' for provider '{}': {e}",
                self.credential_key, self.name
            ))
        })?;

        match credential {
            Some(credential) if !credential.trim().is_empty() => Ok(credential),
            _ => Err(ProviderError::Configuration(format!(
                "credential '{}' for provider '{}' is not set",
                self.credential_key, self.name
            ))),
        }
    }
}

#[async_trait]
impl Provider for OpenAICompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAiCompatible
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
        let credential = self.credential().await?;
        let default_model = self.default_model.as_deref().unwrap_or(DEFAULT_MODEL);
        let payload = build_payload(request, &self.request, Some(default_model))?;

        post_chat_completion(
            client,
            &self.name,
            &self.base_url,
            Some(&credential),
            &self.headers,
            &payload,
            timeout,
        )
        .await
    }
}
