//! Process-wide token bucket rate limiter for SEC requests.
//!
//! SEC's fair-access policy caps automated traffic per host, not per
//! request, so one bucket is shared by every pipeline invocation in the
//! process. Callers reserve a slot under the lock and then sleep until it,
//! which keeps dispatches spaced at the configured rate no matter how many
//! tasks are waiting.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

/// SEC's documented ceiling: 10 requests per second.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 10.0;

/// Default bucket capacity. One token means no bursting at all.
const DEFAULT_BUCKET_CAPACITY: f64 = 1.0;

/// Token bucket state.
#[derive(Debug)]
struct TokenBucket {
    /// Available tokens. Negative while slots are reserved ahead of time.
    tokens: f64,
    /// Last time the bucket was updated.
    last_update: Instant,
    /// Token refill rate (tokens per second).
    rate: f64,
    /// Maximum bucket capacity.
    capacity: f64,
}

impl TokenBucket {
    fn with_config(config: &RateLimitConfig) -> Self {
        let capacity = config.burst_capacity.max(1.0);
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: config.requests_per_second.max(f64::MIN_POSITIVE),
            capacity,
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    /// Try to take a token immediately.
    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Take a token now or in the future, returning how long the caller
    /// must wait before its slot opens.
    fn reserve(&mut self) -> Duration {
        self.refill();
        self.tokens -= 1.0;

        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.rate)
        }
    }
}

/// Rate limiter configuration.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum sustained requests per second.
    pub requests_per_second: f64,
    /// Maximum burst capacity.
    pub burst_capacity: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst_capacity: DEFAULT_BUCKET_CAPACITY,
        }
    }
}

/// Global outbound gate for SEC requests.
///
/// Construct once, wrap in an `Arc`, and hand it to the EDGAR client.
/// [`acquire`](Self::acquire) never fails; it only delays.
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    /// Create a limiter with SEC's default policy.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::with_config(&config)),
        }
    }

    /// Lock the bucket, recovering from poison if necessary.
    ///
    /// The bucket holds plain numbers; the worst a poisoned lock can leave
    /// behind is a slightly early or late slot.
    fn lock_bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter bucket mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Wait until an outbound request slot is available.
    pub async fn acquire(&self) {
        let wait_time = self.lock_bucket().reserve();

        if wait_time > Duration::ZERO {
            debug!("Rate limiter: waiting {:?} for SEC slot", wait_time);
            tokio::time::sleep(wait_time).await;
        } else {
            debug!("Rate limiter: acquired SEC slot");
        }
    }

    /// Try to acquire a slot without waiting.
    ///
    /// Returns true if a slot was acquired, false if rate limited.
    pub fn try_acquire(&self) -> bool {
        self.lock_bucket().try_acquire()
    }

    /// Tokens currently available. Negative while callers are queued.
    pub fn remaining_tokens(&self) -> f64 {
        let mut bucket = self.lock_bucket();
        bucket.refill();
        bucket.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
