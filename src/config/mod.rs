//! Configuration module for the router.
//!
//! The router is configured via a TOML file (or JSON, when the file name ends
//! in `.json`), with support for environment variable interpolation using
//! `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [providers.primary]
//! type = "openai"
//! base_url = "https://api.openai.com/v1"
//! default_model = "gpt-4o-mini"
//! auth = { env = "OPENAI_API_KEY" }
//!
//! [providers.local]
//! type = "http"
//! base_url = "http://localhost:8000/v1"
//!
//! [routing]
//! strategy = "failover-priority"
//! priority = ["primary", "local"]
//! timeout_ms = 20000
//!
//! [routing.retry]
//! max_attempts = 3
//! backoff = { base_ms = 300, max_ms = 4000 }
//!
//! [rate_limit]
//! burst = 10
//! per_provider = { primary = 120 }
//! ```

mod limits;
mod observability;
mod providers;
mod routing;

use std::path::Path;

pub use limits::*;
pub use observability::*;
pub use providers::*;
pub use routing::*;
use serde::{Deserialize, Serialize};

/// Root configuration for the router.
///
/// Only the provider table is required; every other section falls back to
/// the reference defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Backend providers keyed by unique name.
    pub providers: ProvidersConfig,

    /// Provider ordering, timeouts, and retry policy.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Per-provider admission control.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration (used by the CLI binary).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl RouterConfig {
    /// Load configuration from a file.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    /// Environment variables in the format `${VAR_NAME}` are expanded first.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(e, path.to_path_buf()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_str(&contents)
        }
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents, '#')?;
        let config: RouterConfig = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        // JSON has no comments, so every `${VAR}` is expanded.
        let expanded = expand_env_vars(contents, '\0')?;
        let config: RouterConfig = serde_json::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.providers.validate()?;
        self.routing.validate(&self.providers)?;
        self.rate_limit.validate(&self.providers)?;
        Ok(())
    }

    /// Provider names in the order the router should try them.
    ///
    /// `failover-priority` uses the configured priority list verbatim.
    /// `unordered` uses every configured provider, sorted by name so the order
    /// is stable for the lifetime of the process.
    pub fn provider_order(&self) -> Vec<String> {
        match self.routing.strategy {
            RoutingStrategy::FailoverPriority => self.routing.priority.clone(),
            RoutingStrategy::Unordered => {
                let mut names: Vec<String> = self.providers.names().map(String::from).collect();
                names.sort();
                names
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables that appear after `comment` on a line are left untouched.
fn expand_env_vars(input: &str, comment: char) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("invalid interpolation pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find(comment);

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
