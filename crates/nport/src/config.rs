//! Pipeline settings.

use std::time::Duration;

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::client::{RateLimitConfig, RetryPolicy, SecEndpoints, DEFAULT_REQUESTS_PER_SECOND};

/// Default budget for an uncached lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(45);

/// Everything needed to build a [`HoldingsService`](crate::HoldingsService).
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Sent as `User-Agent` on every SEC request; must carry a contact email
    pub user_agent: String,
    pub requests_per_second: f64,
    pub burst_capacity: f64,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Budget for one whole uncached lookup, across every SEC request
    pub lookup_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub endpoints: SecEndpoints,
}

impl PipelineConfig {
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: self.requests_per_second,
            burst_capacity: self.burst_capacity,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_base: self.backoff_base,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let rate = RateLimitConfig::default();
        Self {
            user_agent: String::new(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst_capacity: rate.burst_capacity,
            max_attempts: retry.max_attempts,
            backoff_base: retry.backoff_base,
            http_timeout: Duration::from_secs(30),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            endpoints: SecEndpoints::default(),
        }
    }
}
