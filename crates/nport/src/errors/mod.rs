//! Error types and retry classification for the N-PORT pipeline.
//!
//! This module provides:
//! - [`NportError`]: The error enum shared by every pipeline component
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while locating, fetching or parsing a filing.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which the EDGAR client uses to
/// decide whether another attempt is worthwhile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NportError {
    /// The caller supplied something that cannot be a CIK.
    #[error("CIK must be up to 10 digits.")]
    InvalidCik(String),

    /// No qualifying filing exists, or the filing document is missing.
    /// This is a terminal error - retrying won't help.
    #[error("{0}")]
    NotFound(String),

    /// SEC could not be reached, or kept failing until retries ran out.
    #[error("SEC request failed: {0}")]
    UpstreamUnavailable(String),

    /// SEC throttled the request (HTTP 429, or 403 rate threshold page).
    #[error("SEC is throttling requests. Try again soon.")]
    RateLimited {
        /// Server-suggested pause, from the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// SEC refused the request with a non-transient 4xx status.
    #[error("SEC request failed ({status}) at {url}")]
    Rejected {
        /// HTTP status returned by SEC
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// The submissions index could not be read as expected.
    #[error("Unexpected SEC submissions shape: {0}")]
    MalformedIndex(String),

    /// The filing document is not well-formed XML or lacks a holdings table.
    #[error("Could not extract holdings from filing: {0}")]
    MalformedDocument(String),

    /// Pipeline construction was given unusable settings.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl NportError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use nport_holdings::errors::{NportError, RetryClass};
    ///
    /// let error = NportError::UpstreamUnavailable("HTTP 503".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = NportError::NotFound("no filing".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::UpstreamUnavailable(_) => RetryClass::WithBackoff,
            Self::RateLimited { .. } => RetryClass::Throttled,
            Self::InvalidCik(_)
            | Self::NotFound(_)
            | Self::Rejected { .. }
            | Self::MalformedIndex(_)
            | Self::MalformedDocument(_)
            | Self::Config(_) => RetryClass::Never,
        }
    }

    /// HTTP status the boundary layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCik(_) => 400,
            Self::NotFound(_) => 404,
            Self::RateLimited { .. } => 503,
            Self::UpstreamUnavailable(_)
            | Self::Rejected { .. }
            | Self::MalformedIndex(_)
            | Self::MalformedDocument(_) => 502,
            Self::Config(_) => 500,
        }
    }
}
