use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ProvidersConfig};

/// Per-provider admission control.
///
/// Every configured provider gets its own token bucket holding up to `burst`
/// tokens, refilled at its requests-per-minute rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Bucket capacity shared by all providers.
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Refill rate for providers without an explicit override.
    #[serde(default = "default_requests_per_minute")]
    pub default_requests_per_minute: u32,

    /// Requests-per-minute overrides keyed by provider name.
    #[serde(default)]
    pub per_provider: HashMap<String, u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: default_burst(),
            default_requests_per_minute: default_requests_per_minute(),
            per_provider: HashMap::new(),
        }
    }
}

fn default_burst() -> u32 {
    10
}

fn default_requests_per_minute() -> u32 {
    60
}

impl RateLimitConfig {
    /// Effective requests-per-minute for a provider.
    pub fn requests_per_minute(&self, provider: &str) -> u32 {
        self.per_provider
            .get(provider)
            .copied()
            .unwrap_or(self.default_requests_per_minute)
    }

    pub fn validate(&self, providers: &ProvidersConfig) -> Result<(), ConfigError> {
        if self.burst == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.burst must be at least 1".into(),
            ));
        }

        for name in self.per_provider.keys() {
            if !providers.contains(name) {
                return Err(ConfigError::Validation(format!(
                    "rate_limit.per_provider references undefined provider '{}'",
                    name
                )));
            }
        }

        Ok(())
    }
}
