//! Observability for the router.
//!
//! The router reports every provider attempt to an injected
//! [`RouterObserver`] instead of writing to global state:
//! - [`TracingObserver`] (default) emits structured `tracing` events
//! - [`MetricsObserver`] records Prometheus-style counters and histograms
//!   through the `metrics` facade (requires the `prometheus` feature)
//! - [`NoopObserver`] discards everything
//!
//! Logging setup for the CLI binary lives in `tracing_init`.

#[cfg(feature = "prometheus")]
pub mod metrics;
#[cfg(feature = "cli")]
mod tracing_init;

use std::time::Duration;

#[cfg(feature = "prometheus")]
pub use metrics::MetricsObserver;
#[cfg(feature = "cli")]
pub use tracing_init::*;

use crate::providers::ErrorKind;

/// Result of one provider attempt, as seen by an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
    Success,
    Timeout,
    Failure,
    /// Rejected by the provider's token bucket; no network call was made.
    RateLimited,
    Configuration,
    Cancelled,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::Failure => "failure",
            Self::RateLimited => "rate_limited",
            Self::Configuration => "configuration",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<ErrorKind> for AttemptOutcome {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Timeout => Self::Timeout,
            ErrorKind::RateLimited => Self::RateLimited,
            ErrorKind::Configuration => Self::Configuration,
            ErrorKind::Cancelled => Self::Cancelled,
            ErrorKind::ProviderFailure | ErrorKind::AllProvidersFailed => Self::Failure,
        }
    }
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives per-attempt events from the failover router.
///
/// Called on the request path, so implementations must not block.
pub trait RouterObserver: Send + Sync {
    /// Called once per attempt, and once per rate-limited skip.
    fn record_attempt(&self, provider: &str, outcome: AttemptOutcome);

    /// Wall-clock duration of one network attempt, whatever its outcome.
    fn record_latency(&self, provider: &str, duration: Duration);
}

/// Emits a `debug!` event per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RouterObserver for TracingObserver {
    fn record_attempt(&self, provider: &str, outcome: AttemptOutcome) {
        tracing::debug!(provider, outcome = outcome.as_str(), "Provider attempt");
    }

    fn record_latency(&self, provider: &str, duration: Duration) {
        tracing::debug!(
            provider,
            duration_ms = duration.as_millis(),
            "Provider attempt latency"
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RouterObserver for NoopObserver {
    fn record_attempt(&self, _provider: &str, _outcome: AttemptOutcome) {}

    fn record_latency(&self, _provider: &str, _duration: Duration) {}
}
