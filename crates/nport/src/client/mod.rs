//! Outbound access to SEC hosts.
//!
//! - `rate_limiter` - Process-wide token bucket enforcing the fair-access rate
//! - `headers` - Contact-bearing user agent and request headers
//! - `transport` - HTTP seam (reqwest in production, scripted in tests)
//! - `edgar` - Rate-limited, retrying client and SEC URL layout

mod edgar;
mod headers;
mod rate_limiter;
mod transport;

pub use edgar::{
    EdgarClient, RetryPolicy, SecEndpoints, DEFAULT_ARCHIVES_BASE_URL, DEFAULT_DATA_BASE_URL,
};
pub use headers::{sec_headers, UserAgent};
pub use rate_limiter::{RateLimitConfig, RateLimiter, DEFAULT_REQUESTS_PER_SECOND};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
