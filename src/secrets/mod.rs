//! Secrets lookup for provider credentials.
//!
//! Supports two backends:
//! - Environment variables (default)
//! - In-memory (for testing and embedders that manage keys themselves)

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SecretResult<T> = Result<T, SecretError>;

/// Trait for resolving secrets (provider API keys, etc.)
#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Get a secret by key. Returns None if not found.
    async fn get(&self, key: &str) -> SecretResult<Option<String>>;
}

/// In-memory secret manager
pub struct MemorySecretManager {
    secrets: dashmap::DashMap<String, String>,
}

impl MemorySecretManager {
    pub fn new() -> Self {
        Self {
            secrets: dashmap::DashMap::new(),
        }
    }

    /// Store or replace a secret.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(key.into(), value.into());
    }

    /// Remove a secret.
    pub fn remove(&self, key: &str) {
        self.secrets.remove(key);
    }
}

impl Default for MemorySecretManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretManager for MemorySecretManager {
    async fn get(&self, key: &str) -> SecretResult<Option<String>> {
        Ok(self.secrets.get(key).map(|v| v.value().clone()))
    }
}

/// Environment-based secret manager (reads from env vars on every lookup)
pub struct EnvSecretManager;

impl EnvSecretManager {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvSecretManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretManager for EnvSecretManager {
    async fn get(&self, key: &str) -> SecretResult<Option<String>> {
        match std::env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::Internal(format!(
                "environment variable '{key}' is not valid UTF-8"
            ))),
        }
    }
}
