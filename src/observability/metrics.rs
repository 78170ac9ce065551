//! Prometheus metrics for the router.
//!
//! Metrics go through the `metrics` facade; the embedding application
//! installs whichever recorder/exporter it uses. Without a recorder the
//! macros are no-ops.

use std::time::Duration;

use metrics::{counter, histogram};

use super::{AttemptOutcome, RouterObserver};

/// Records attempt counts and latencies.
///
/// - `llm_router_attempts_total{provider, outcome}`
/// - `llm_router_attempt_duration_seconds{provider}`
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl RouterObserver for MetricsObserver {
    fn record_attempt(&self, provider: &str, outcome: AttemptOutcome) {
        counter!(
            "llm_router_attempts_total",
            "provider" => provider.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }

    fn record_latency(&self, provider: &str, duration: Duration) {
        histogram!("llm_router_attempt_duration_seconds", "provider" => provider.to_string())
            .record(duration.as_secs_f64());
    }
}
