//! Client-side token bucket rate limiting, one bucket per provider.
//!
//! A bucket starts full. Each admitted request consumes one token; tokens
//! refill continuously at `requests_per_minute / 60` per second up to the
//! burst capacity. Admission never waits: an empty bucket rejects and the
//! router moves on to the next provider.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::{ProvidersConfig, RateLimitConfig};

/// Lower bound on the refill rate, in tokens per second.
const MIN_REFILL_PER_SEC: f64 = 0.001;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket for a single provider.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket holding `burst` tokens (minimum 1) that refills at
    /// `requests_per_minute / 60` tokens per second (minimum 0.001).
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        let refill_per_sec = (f64::from(requests_per_minute) / 60.0).max(MIN_REFILL_PER_SEC);
        Self {
            capacity,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Try to take one token. Never blocks.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after accounting for elapsed refill time.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_per_sec(&self) -> f64 {
        self.refill_per_sec
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
    }
}

/// Point-in-time view of one provider's bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    pub provider: String,
    pub capacity: f64,
    pub available_tokens: f64,
    pub refill_per_sec: f64,
}

/// Per-provider token buckets.
///
/// The map is built once at construction and never mutated, so lookups take
/// no lock; each bucket serializes its own updates.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    buckets: Arc<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    /// One bucket per configured provider, sized from the rate limit config.
    pub fn from_config(providers: &ProvidersConfig, config: &RateLimitConfig) -> Self {
        let buckets = providers
            .names()
            .map(|name| {
                let bucket = TokenBucket::new(config.requests_per_minute(name), config.burst);
                (name.to_string(), bucket)
            })
            .collect();
        Self {
            buckets: Arc::new(buckets),
        }
    }

    pub fn with_buckets(buckets: impl IntoIterator<Item = (String, TokenBucket)>) -> Self {
        Self {
            buckets: Arc::new(buckets.into_iter().collect()),
        }
    }

    /// Try to admit one request to `provider`. Providers without a bucket are
    /// always admitted.
    pub fn allow(&self, provider: &str) -> bool {
        self.buckets
            .get(provider)
            .map(TokenBucket::allow)
            .unwrap_or(true)
    }

    pub fn bucket(&self, provider: &str) -> Option<&TokenBucket> {
        self.buckets.get(provider)
    }

    /// Snapshot of every bucket, sorted by provider name.
    pub fn status(&self) -> Vec<RateLimitStatus> {
        let mut status: Vec<_> = self
            .buckets
            .iter()
            .map(|(provider, bucket)| RateLimitStatus {
                provider: provider.clone(),
                capacity: bucket.capacity(),
                available_tokens: bucket.available(),
                refill_per_sec: bucket.refill_per_sec(),
            })
            .collect();
        status.sort_by(|a, b| a.provider.cmp(&b.provider));
        status
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_full_bucket_admits_burst_then_rejects() {
        let bucket = TokenBucket::new(60, 3);

        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_refills_over_time() {
        // 60 rpm = 1 token per second
        let bucket = TokenBucket::new(60, 2);
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!bucket.allow());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_never_exceeds_capacity() {
        let bucket = TokenBucket::new(600, 5);
        assert!(bucket.allow());

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(bucket.available(), 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rpm_clamps_to_minimum_rate() {
        let bucket = TokenBucket::new(0, 1);
        assert_eq!(bucket.refill_per_sec(), MIN_REFILL_PER_SEC);

        assert!(bucket.allow());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!bucket.allow());

        // 0.001 tokens/sec needs 1000 seconds for a full token
        tokio::time::advance(Duration::from_secs(1000)).await;
        assert!(bucket.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_burst_clamps_to_one() {
        let bucket = TokenBucket::new(60, 0);
        assert_eq!(bucket.capacity(), 1.0);
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }

    fn providers() -> ProvidersConfig {
        toml::from_str(
            r#"
            [a]
            type = "http"
            base_url = "http://a"

            [b]
            type = "http"
            base_url = "http://b"
        "#,
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_uses_per_provider_rates() {
        let config: RateLimitConfig = toml::from_str(
            r#"
            burst = 2
            default_requests_per_minute = 120
            per_provider = { a = 6 }
        "#,
        )
        .unwrap();
        let limiter = RateLimiter::from_config(&providers(), &config);

        let status = limiter.status();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].provider, "a");
        assert!((status[0].refill_per_sec - 0.1).abs() < 1e-9);
        assert_eq!(status[1].provider, "b");
        assert!((status[1].refill_per_sec - 2.0).abs() < 1e-9);
        assert_eq!(status[1].capacity, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiter_buckets_are_independent() {
        let config: RateLimitConfig = toml::from_str("burst = 1").unwrap();
        let limiter = RateLimiter::from_config(&providers(), &config);

        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[tokio::test]
    async fn test_unknown_provider_always_admitted() {
        let limiter = RateLimiter::default();
        for _ in 0..100 {
            assert!(limiter.allow("anything"));
        }
        assert!(limiter.status().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admission_respects_capacity() {
        let limiter = RateLimiter::with_buckets([("a".to_string(), TokenBucket::new(0, 50))]);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                (0..20).filter(|_| limiter.allow("a")).count()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            admitted += handle.await.unwrap();
        }
        assert_eq!(admitted, 50);
    }
}
