//! Routing configuration: provider ordering, per-attempt timeout, and retry.

use std::{collections::HashSet, time::Duration};

use serde::{Deserialize, Serialize};

use super::{ConfigError, ProvidersConfig};

/// How the router orders providers for each call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    /// Try providers in the configured `priority` order.
    #[default]
    FailoverPriority,
    /// Try every configured provider in an implementation-defined but
    /// process-stable order.
    Unordered,
}

/// Routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Provider ordering strategy.
    #[serde(default)]
    pub strategy: RoutingStrategy,

    /// Provider names, most preferred first.
    #[serde(default)]
    pub priority: Vec<String>,

    /// Network deadline for a single attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retry policy applied to each provider.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: RoutingStrategy::default(),
            priority: Vec::new(),
            timeout_ms: default_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl RoutingConfig {
    /// Per-attempt network deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self, providers: &ProvidersConfig) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "routing.timeout_ms must be greater than 0".into(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.priority {
            if !providers.contains(name) {
                return Err(ConfigError::Validation(format!(
                    "routing.priority references undefined provider '{}'",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "routing.priority lists provider '{}' more than once",
                    name
                )));
            }
        }

        if self.strategy == RoutingStrategy::FailoverPriority && self.priority.is_empty() {
            return Err(ConfigError::Validation(
                "routing.priority must list at least one provider when strategy is \
                 'failover-priority'"
                    .into(),
            ));
        }

        self.retry.validate()
    }
}

fn default_timeout_ms() -> u64 {
    20_000
}

/// Retry configuration for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per provider, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Exponential backoff between attempts.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential backoff bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,

    /// Upper bound on any single delay in milliseconds.
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Random jitter as a fraction of the computed delay (0.0-1.0).
    /// Zero keeps delays deterministic.
    #[serde(default)]
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            max_ms: default_max_ms(),
            jitter: 0.0,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_ms() -> u64 {
    300
}

fn default_max_ms() -> u64 {
    4000
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.backoff.base_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.backoff.max_ms)
    }

    /// Calculate the delay before retrying after a failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped =
            crate::providers::retry::backoff_delay(attempt, self.base_delay(), self.max_delay());

        let jitter_range = capped.as_millis() as f64 * self.backoff.jitter;
        if jitter_range <= 0.0 {
            return capped;
        }

        use rand::Rng;
        let jitter = rand::thread_rng().gen_range(-jitter_range..jitter_range);
        let final_delay = (capped.as_millis() as f64 + jitter).max(0.0);
        Duration::from_millis(final_delay as u64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "routing.retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.backoff.base_ms > self.backoff.max_ms {
            return Err(ConfigError::Validation(format!(
                "routing.retry.backoff.base_ms ({}) must not exceed max_ms ({})",
                self.backoff.base_ms, self.backoff.max_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.backoff.jitter) {
            return Err(ConfigError::Validation(format!(
                "routing.retry.backoff.jitter must be between 0.0 and 1.0, got {}",
                self.backoff.jitter
            )));
        }
        Ok(())
    }
}
