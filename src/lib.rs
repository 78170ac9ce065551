//! Resilient multi-provider chat completion routing.
//!
//! One call, [`LlmAdapter::chat`], fans a chat request out over a configured
//! set of LLM backends:
//! - a per-provider token bucket decides whether a provider may be tried
//! - each admitted provider gets a bounded number of attempts with
//!   exponential backoff between them
//! - providers are walked in priority order until one succeeds
//! - whatever shape the backend answers in, the caller gets one canonical
//!   chat completion response

pub mod adapter;
pub mod api_types;
pub mod config;
pub mod observability;
pub mod providers;
pub mod routing;
pub mod secrets;

#[cfg(test)]
mod tests;

pub use adapter::{LlmAdapter, LlmAdapterBuilder};
pub use api_types::{ChatCompletionResponse, ChatMessage, ChatOptions, ChatRequest};
pub use config::{ConfigError, RouterConfig};
pub use observability::{AttemptOutcome, NoopObserver, RouterObserver, TracingObserver};
pub use providers::{ErrorKind, ProviderError, RateLimitStatus};
pub use routing::{ProviderFailure, RouterError};
pub use secrets::{EnvSecretManager, MemorySecretManager, SecretManager};
