//! N-PORT Holdings Crate
//!
//! Resolves a fund's CIK to the portfolio holdings reported in its most
//! recent public N-PORT-P filing on SEC EDGAR.
//!
//! # Overview
//!
//! - Fair-access compliant SEC access: one process-wide rate limiter, a
//!   contact-bearing user agent, bounded retries
//! - Latest filing selection from the issuer's submissions index
//! - Streaming parse of the N-PORT XML schema into normalized holdings
//! - Per-CIK result cache with TTL
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |  HoldingsService | --> |   ResultCache    |  (moka, TTL per CIK)
//! +------------------+     +------------------+
//!          | miss
//!          v
//! +------------------+     +------------------+
//! |  FilingLocator   | --> | DocumentFetcher  |
//! +------------------+     +------------------+
//!          |                        |
//!          +-----------+------------+
//!                      v
//!             +------------------+
//!             |   EdgarClient    |  (rate limit, headers, retry)
//!             +------------------+
//!                      |
//!                      v
//!             +------------------+
//!             |  HttpTransport   |  (reqwest)
//!             +------------------+
//!
//! DocumentFetcher body --> parse_holdings --> FilingResult
//! ```
//!
//! # Example
//!
//! ```no_run
//! use nport_holdings::{HoldingsService, HoldingsServiceTrait, PipelineConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig {
//!     user_agent: "Holdings Viewer (ops@example.com)".to_string(),
//!     ..PipelineConfig::default()
//! };
//! let service = HoldingsService::from_config(&config)?;
//! let result = service.resolve_holdings("884394").await?;
//! println!("{} holdings as of {:?}", result.count, result.as_of);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod locator;
pub mod models;
pub mod parser;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache::{CacheStats, ResultCache};
pub use client::{EdgarClient, HttpTransport, RateLimiter, RetryPolicy, SecEndpoints, UserAgent};
pub use config::PipelineConfig;
pub use errors::{NportError, RetryClass};
pub use fetcher::{DocumentFetcher, FetchedDocument};
pub use locator::{FilingLocator, LocatedFiling};
pub use models::{Cik, FilingLocation, FilingResult, Holding};
pub use parser::{parse_holdings, parse_money, ParsedDocument};
pub use service::{HoldingsService, HoldingsServiceTrait, PipelineError, PipelineStage};
