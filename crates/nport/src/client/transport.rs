//! HTTP transport seam.
//!
//! The EDGAR client talks to SEC through [`HttpTransport`] so that retry,
//! rate limiting and status classification can be exercised against a
//! scripted transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// A fully-read HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Parsed `Retry-After` header, when given in seconds
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }
}

/// Failure to obtain any response at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    /// The request could not be built or sent for a non-network reason.
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET with exactly the given headers.
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() || err.is_body() || err.is_decode() || err.is_request() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
