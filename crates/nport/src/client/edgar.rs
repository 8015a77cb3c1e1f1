//! EDGAR client: the single path every SEC request takes.
//!
//! Each attempt first passes the shared [`RateLimiter`], carries the
//! identification headers, and has its outcome classified. Transient
//! failures are retried in an explicit loop with exponential backoff up to a
//! fixed attempt ceiling.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::errors::{NportError, RetryClass};
use crate::models::{Cik, FilingLocation};

use super::headers::{sec_headers, UserAgent};
use super::rate_limiter::RateLimiter;
use super::transport::{HttpResponse, HttpTransport};

pub const DEFAULT_DATA_BASE_URL: &str = "https://data.sec.gov";
pub const DEFAULT_ARCHIVES_BASE_URL: &str = "https://www.sec.gov/Archives";

/// Throttled attempts back off this many times longer than transient ones.
const THROTTLE_BACKOFF_FACTOR: u32 = 4;

/// Bounded retry settings.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each time after.
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    /// Delay after a throttled attempt, unless SEC named one.
    pub fn throttle_backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_for(attempt)
            .saturating_mul(THROTTLE_BACKOFF_FACTOR)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Base URLs of the two SEC hosts the pipeline reads from.
#[derive(Clone, Debug)]
pub struct SecEndpoints {
    /// Host of the submissions index (`https://data.sec.gov`)
    pub data_base_url: String,
    /// Root of the filing archives (`https://www.sec.gov/Archives`)
    pub archives_base_url: String,
}

impl Default for SecEndpoints {
    fn default() -> Self {
        Self {
            data_base_url: DEFAULT_DATA_BASE_URL.to_string(),
            archives_base_url: DEFAULT_ARCHIVES_BASE_URL.to_string(),
        }
    }
}

impl SecEndpoints {
    pub fn submissions_url(&self, cik: &Cik) -> String {
        format!(
            "{}/submissions/CIK{}.json",
            self.data_base_url.trim_end_matches('/'),
            cik.as_str()
        )
    }

    /// Folder holding every document of one filing, with trailing slash.
    pub fn filing_folder_url(&self, cik: &Cik, location: &FilingLocation) -> String {
        format!(
            "{}/edgar/data/{}/{}/",
            self.archives_base_url.trim_end_matches('/'),
            cik.unpadded(),
            location.accession_folder()
        )
    }
}

/// Rate-limited, retrying GET client for SEC hosts.
pub struct EdgarClient {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    headers: HeaderMap,
    retry: RetryPolicy,
    endpoints: SecEndpoints,
}

impl EdgarClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
        user_agent: &UserAgent,
        retry: RetryPolicy,
        endpoints: SecEndpoints,
    ) -> Self {
        Self {
            transport,
            limiter,
            headers: sec_headers(user_agent),
            retry,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &SecEndpoints {
        &self.endpoints
    }

    /// GET a document as text, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - `NotFound` on HTTP 404 (no retry)
    /// - `Rejected` on any other non-throttling 4xx (no retry)
    /// - `RateLimited` if SEC is still throttling after the last attempt
    /// - `UpstreamUnavailable` once transient failures exhaust the attempts
    pub async fn get_text(&self, url: &str) -> Result<String, NportError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.limiter.acquire().await;
            debug!(url, attempt, "SEC request");

            let err = match self.send_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };

            let delay = match err.retry_class() {
                RetryClass::Never => return Err(err),
                _ if attempt >= max_attempts => {
                    return Err(match err {
                        NportError::UpstreamUnavailable(reason) => {
                            NportError::UpstreamUnavailable(format!(
                                "{} (gave up after {} attempts)",
                                reason, attempt
                            ))
                        }
                        other => other,
                    });
                }
                RetryClass::WithBackoff => self.retry.backoff_for(attempt),
                RetryClass::Throttled => match &err {
                    NportError::RateLimited {
                        retry_after: Some(after),
                    } => *after,
                    _ => self.retry.throttle_backoff_for(attempt),
                },
            };

            warn!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "SEC request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(&self, url: &str) -> Result<String, NportError> {
        match self.transport.get(url, &self.headers).await {
            Ok(response) => classify_response(url, response),
            Err(err) if err.is_transient() => {
                Err(NportError::UpstreamUnavailable(format!("{} at {}", err, url)))
            }
            Err(err) => Err(NportError::Config(format!("cannot request {}: {}", url, err))),
        }
    }
}

/// Map an HTTP response onto the pipeline's error taxonomy.
fn classify_response(url: &str, response: HttpResponse) -> Result<String, NportError> {
    let status = response.status;

    if status.is_success() {
        return Ok(response.body);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(NportError::NotFound(format!("SEC document not found at {}", url)));
    }

    // SEC answers over-threshold clients with 403 and an explanatory page.
    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && is_rate_threshold_page(&response.body))
    {
        return Err(NportError::RateLimited {
            retry_after: response.retry_after,
        });
    }

    if status.is_server_error() {
        return Err(NportError::UpstreamUnavailable(format!(
            "HTTP {} at {}",
            status.as_u16(),
            url
        )));
    }

    Err(NportError::Rejected {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

fn is_rate_threshold_page(body: &str) -> bool {
    body.to_ascii_lowercase().contains("request rate threshold exceeded")
}
