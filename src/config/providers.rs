//! Provider configuration module.
//!
//! Providers are configured with custom names and specify their API type.
//! This allows multiple providers of the same type (e.g., several
//! OpenAI-compatible endpoints) with different configurations.
//!
//! # Example
//!
//! ```toml
//! [providers.openrouter]
//! type = "openai"
//! base_url = "https://openrouter.ai/api/v1/"
//! default_model = "openai/gpt-4o-mini"
//! auth = { env = "OPENROUTER_API_KEY" }
//! headers = { "HTTP-Referer" = "https://example.com" }
//!
//! [providers.vllm]
//! type = "http"
//! base_url = "http://localhost:8000/v1"
//! default_model = "qwen2.5-7b-instruct"
//! request = { temperature = 0.2, top_p = 0.9 }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ConfigError;

/// Provider configurations container.
///
/// Each provider has a unique name (the table key) and specifies its type
/// to determine which request convention to use.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    /// Provider configurations keyed by unique name.
    #[serde(flatten)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl ProvidersConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one provider must be configured".into(),
            ));
        }

        for (name, config) in &self.providers {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "provider names must not be empty".into(),
                ));
            }
            config
                .validate()
                .map_err(|e| ConfigError::Validation(format!("provider '{}': {}", name, e)))?;
        }

        Ok(())
    }

    /// Number of configured providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if any providers are configured.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Whether a provider with this name is configured.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Iterate over all provider names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Iterate over all providers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderConfig)> {
        self.providers.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Provider type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    OpenAiCompatible,
    GenericHttp,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "openai-compatible",
            Self::GenericHttp => "generic-http",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single provider.
///
/// The `type` field determines which request convention to use. Unknown
/// types are rejected when the configuration is parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderConfig {
    /// OpenAI-compatible API with bearer authentication (OpenAI, OpenRouter,
    /// Groq, Together, and similar hosted services).
    #[serde(rename = "openai", alias = "openai-compatible", alias = "open_ai")]
    OpenAi(OpenAiProviderConfig),

    /// Plain HTTP endpoint following the `/chat/completions` convention
    /// without authentication (vLLM, llama.cpp server, in-house services).
    #[serde(rename = "http", alias = "generic-http")]
    Http(HttpProviderConfig),
}

impl ProviderConfig {
    /// Get the provider type.
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::OpenAi(_) => ProviderType::OpenAiCompatible,
            Self::Http(_) => ProviderType::GenericHttp,
        }
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        match self {
            Self::OpenAi(c) => c.base_url.trim_end_matches('/'),
            Self::Http(c) => c.base_url.trim_end_matches('/'),
        }
    }

    /// Model used when the request does not name one.
    pub fn default_model(&self) -> Option<&str> {
        match self {
            Self::OpenAi(c) => c.default_model.as_deref(),
            Self::Http(c) => c.default_model.as_deref(),
        }
    }

    /// Fixed request fields merged into every payload sent to this provider.
    pub fn request_overrides(&self) -> &Map<String, Value> {
        match self {
            Self::OpenAi(c) => &c.request,
            Self::Http(c) => &c.request,
        }
    }

    /// Extra headers sent with every request.
    pub fn headers(&self) -> &HashMap<String, String> {
        match self {
            Self::OpenAi(c) => &c.headers,
            Self::Http(c) => &c.headers,
        }
    }

    fn validate(&self) -> Result<(), String> {
        let base_url = match self {
            Self::OpenAi(c) => &c.base_url,
            Self::Http(c) => &c.base_url,
        };
        validate_base_url(base_url)?;
        validate_headers(self.headers())?;

        if let Self::OpenAi(c) = self
            && c.auth.env.trim().is_empty()
        {
            return Err("auth.env must name an environment variable".into());
        }

        Ok(())
    }
}

fn validate_headers(headers: &HashMap<String, String>) -> Result<(), String> {
    for (name, value) in headers {
        http::HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name '{name}': {e}"))?;
        http::HeaderValue::from_str(value)
            .map_err(|e| format!("invalid value for header '{name}': {e}"))?;
    }
    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), String> {
    let parsed =
        url::Url::parse(base_url).map_err(|e| format!("invalid base_url '{base_url}': {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "base_url '{base_url}' must use http or https, not '{other}'"
        )),
    }
}

/// Configuration for OpenAI-compatible providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiProviderConfig {
    /// Base URL for the API (without the `/chat/completions` suffix).
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model used when the request does not specify one.
    #[serde(default)]
    pub default_model: Option<String>,

    /// Fixed request fields merged into every payload.
    #[serde(default)]
    pub request: Map<String, Value>,

    /// Where to find the bearer credential.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Custom headers to include in requests.
    /// Useful for provider-specific headers like OpenRouter's HTTP-Referer.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Configuration for generic HTTP providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpProviderConfig {
    /// Base URL for the API (without the `/chat/completions` suffix).
    pub base_url: String,

    /// Model used when the request does not specify one.
    /// When absent the payload carries no `model` field.
    #[serde(default)]
    pub default_model: Option<String>,

    /// Fixed request fields merged into every payload.
    #[serde(default)]
    pub request: Map<String, Value>,

    /// Custom headers to include in requests.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Reference to the secret holding a provider's bearer credential.
///
/// The credential itself is never stored in configuration; it is resolved
/// on every call so rotated keys take effect without a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Environment variable (secret key) holding the credential.
    #[serde(default = "default_auth_env")]
    pub env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            env: default_auth_env(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_auth_env() -> String {
    "OPENAI_API_KEY".to_string()
}
