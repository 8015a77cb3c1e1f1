//! Holdings service: facade over the whole pipeline.
//!
//! ```text
//! CacheCheck ──hit──────────────────────────────────────────► result
//!     │ miss
//!     ▼
//! Resolving ──► Fetching ──► Parsing ──► Cached ────────────► result
//!     │             │            │
//!     └─────────────┴────────────┴──► PipelineError { stage, source }
//! ```
//!
//! Failures are never cached; the next call starts over from `CacheCheck`.
//! An uncached lookup has one overall deadline; running past it fails the
//! current stage with `UpstreamUnavailable`.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::client::{EdgarClient, HttpTransport, RateLimiter, ReqwestTransport, UserAgent};
use crate::config::{PipelineConfig, DEFAULT_LOOKUP_TIMEOUT};
use crate::errors::NportError;
use crate::fetcher::DocumentFetcher;
use crate::locator::FilingLocator;
use crate::models::{total_value, Cik, FilingResult};
use crate::parser::parse_holdings;

/// Where a pipeline run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    CacheCheck,
    Resolving,
    Fetching,
    Parsing,
    Cached,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CacheCheck => "cache_check",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Cached => "cached",
        };
        f.write_str(name)
    }
}

/// The only error that leaves the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source}")]
pub struct PipelineError {
    /// Stage that failed
    pub stage: PipelineStage,
    #[source]
    pub source: NportError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: NportError) -> Self {
        Self { stage, source }
    }

    /// HTTP status to answer with.
    pub fn status(&self) -> u16 {
        self.source.status_code()
    }

    /// Human-readable message for the caller.
    pub fn message(&self) -> String {
        self.source.to_string()
    }
}

/// Holdings lookups by CIK.
#[async_trait]
pub trait HoldingsServiceTrait: Send + Sync {
    /// Resolve the latest N-PORT-P holdings for a CIK, from cache when fresh.
    async fn resolve_holdings(&self, cik: &str) -> Result<Arc<FilingResult>, PipelineError>;
}

/// Cache-first pipeline from CIK to normalized holdings.
pub struct HoldingsService {
    locator: FilingLocator,
    fetcher: DocumentFetcher,
    cache: Arc<ResultCache>,
    lookup_timeout: Duration,
    fetches: AtomicU64,
}

impl HoldingsService {
    pub fn new(client: Arc<EdgarClient>, cache: Arc<ResultCache>) -> Self {
        Self {
            locator: FilingLocator::new(client.clone()),
            fetcher: DocumentFetcher::new(client),
            cache,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            fetches: AtomicU64::new(0),
        }
    }

    /// Overall budget for one uncached lookup.
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Build the production pipeline: reqwest transport, one shared limiter
    /// and one cache.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, NportError> {
        let transport = ReqwestTransport::new(config.http_timeout)
            .map_err(|e| NportError::Config(format!("cannot build HTTP client: {}", e)))?;
        Self::with_transport(Arc::new(transport), config)
    }

    /// Build the pipeline over any transport.
    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        config: &PipelineConfig,
    ) -> Result<Self, NportError> {
        let user_agent = UserAgent::new(config.user_agent.clone())?;
        let client = EdgarClient::new(
            transport,
            Arc::new(RateLimiter::with_config(config.rate_limit())),
            &user_agent,
            config.retry_policy(),
            config.endpoints.clone(),
        );
        let cache = ResultCache::new(config.cache_ttl, config.cache_capacity);
        Ok(Self::new(Arc::new(client), Arc::new(cache)).with_lookup_timeout(config.lookup_timeout))
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Number of upstream fetch sequences started (cache misses).
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Run one stage, failing it if the lookup deadline passes first.
    async fn stage<T, F>(
        &self,
        stage: PipelineStage,
        deadline: Instant,
        work: F,
    ) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, NportError>>,
    {
        match timeout_at(deadline, work).await {
            Ok(result) => result.map_err(|e| PipelineError::new(stage, e)),
            Err(_) => Err(PipelineError::new(
                stage,
                NportError::UpstreamUnavailable(format!(
                    "lookup did not finish within {} ms",
                    self.lookup_timeout.as_millis()
                )),
            )),
        }
    }

    async fn fetch_fresh(&self, cik: &Cik) -> Result<FilingResult, PipelineError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.lookup_timeout;

        debug!(cik = %cik, stage = %PipelineStage::Resolving, "Pipeline stage");
        let located = self
            .stage(PipelineStage::Resolving, deadline, self.locator.locate(cik))
            .await?;
        let location = located.location;

        debug!(cik = %cik, stage = %PipelineStage::Fetching, accession = %location.accession_number, "Pipeline stage");
        let document = self
            .stage(
                PipelineStage::Fetching,
                deadline,
                self.fetcher.fetch_primary(cik, &location),
            )
            .await?;

        debug!(cik = %cik, stage = %PipelineStage::Parsing, url = %document.url, "Pipeline stage");
        let parsed = parse_holdings(&document.body)
            .map_err(|e| PipelineError::new(PipelineStage::Parsing, e))?;

        if parsed.dropped_rows > 0 {
            debug!(cik = %cik, dropped = parsed.dropped_rows, "Skipped unidentifiable rows");
        }

        let total_value_usd = total_value(&parsed.holdings);
        if total_value_usd.is_none() {
            warn!(cik = %cik, "Filing-wide value total overflowed, percentages left blank");
        }
        Ok(FilingResult {
            cik: cik.clone(),
            as_of: parsed.report_date.or_else(|| location.as_of()),
            count: parsed.holdings.len(),
            holdings: parsed.holdings,
            accession: location.accession_number,
            form: location.form,
            filing_date: location.filing_date,
            fund_name: parsed.fund_name.or(located.registrant_name),
            document_url: document.url,
            total_value_usd,
            net_assets: parsed.net_assets,
        })
    }
}

#[async_trait]
impl HoldingsServiceTrait for HoldingsService {
    async fn resolve_holdings(&self, cik: &str) -> Result<Arc<FilingResult>, PipelineError> {
        let cik = Cik::parse(cik).map_err(|e| PipelineError::new(PipelineStage::CacheCheck, e))?;

        if let Some(hit) = self.cache.get(&cik) {
            debug!(cik = %cik, stage = %PipelineStage::CacheCheck, "Cache hit");
            return Ok(hit);
        }
        debug!(cik = %cik, stage = %PipelineStage::CacheCheck, "Cache miss");

        let result = match self.fetch_fresh(&cik).await {
            Ok(result) => result,
            Err(err) => {
                warn!(cik = %cik, stage = %err.stage, status = err.status(), "Holdings lookup failed: {}", err);
                return Err(err);
            }
        };

        let result = self.cache.put(&cik, result);
        info!(
            cik = %cik,
            stage = %PipelineStage::Cached,
            accession = %result.accession,
            count = result.count,
            "Resolved holdings"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        ScriptedTransport, SAMPLE_CIK, SAMPLE_DOCUMENT_URL, SAMPLE_SUBMISSIONS_JSON,
        SAMPLE_SUBMISSIONS_URL, TEST_USER_AGENT,
    };
    use reqwest::StatusCode;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn config() -> PipelineConfig {
        PipelineConfig {
            user_agent: TEST_USER_AGENT.to_string(),
            cache_ttl: Duration::from_secs(60),
            ..PipelineConfig::default()
        }
    }

    fn service(transport: Arc<ScriptedTransport>, config: &PipelineConfig) -> HoldingsService {
        HoldingsService::with_transport(transport, config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_sample_filing() {
        let transport = Arc::new(ScriptedTransport::with_sample_filing());
        let service = service(transport.clone(), &config());

        let result = service.resolve_holdings("884394").await.unwrap();
        assert_eq!(result.cik.as_str(), SAMPLE_CIK);
        assert_eq!(result.accession, "0001752724-25-211156");
        assert_eq!(result.as_of.as_deref(), Some("2025-06-30"));
        assert_eq!(result.fund_name.as_deref(), Some("SPDR S&P 500 ETF TRUST"));
        assert_eq!(result.document_url, SAMPLE_DOCUMENT_URL);
        assert_eq!(result.count, 3);
        assert_eq!(result.count, result.holdings.len());

        let sum: Decimal = result.holdings.iter().map(|h| h.value_usd).sum();
        assert_eq!(Some(sum), result.total_value_usd);
        let pct: Decimal = result.holdings.iter().filter_map(|h| h.percent_value).sum();
        assert!((pct - Decimal::ONE_HUNDRED).abs() < Decimal::new(1, 6));

        for call in transport.calls() {
            assert_eq!(call.user_agent.as_deref(), Some(TEST_USER_AGENT));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_within_ttl_is_served_from_cache() {
        let transport = Arc::new(ScriptedTransport::with_sample_filing());
        let service = service(transport.clone(), &config());

        let first = service.resolve_holdings(SAMPLE_CIK).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let second = service.resolve_holdings("CIK884394").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.fetch_count(), 1);
        assert_eq!(transport.call_count(SAMPLE_SUBMISSIONS_URL), 1);
        assert_eq!(transport.call_count(SAMPLE_DOCUMENT_URL), 1);
    }

    #[tokio::test]
    async fn test_call_after_ttl_refetches() {
        let transport = Arc::new(ScriptedTransport::with_sample_filing());
        let config = PipelineConfig {
            cache_ttl: Duration::from_millis(100),
            ..config()
        };
        let service = service(transport.clone(), &config);
        let cik = Cik::parse(SAMPLE_CIK).unwrap();

        service.resolve_holdings(SAMPLE_CIK).await.unwrap();
        let first_fetch = service.cache().fetched_at(&cik).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        service.resolve_holdings(SAMPLE_CIK).await.unwrap();
        let second_fetch = service.cache().fetched_at(&cik).unwrap();

        assert_eq!(service.fetch_count(), 2);
        assert_eq!(transport.call_count(SAMPLE_SUBMISSIONS_URL), 2);
        assert!(second_fetch > first_fetch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_cik_is_not_found() {
        let transport = Arc::new(ScriptedTransport::new());
        let service = service(transport, &config());

        let err = service.resolve_holdings("123").await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Resolving);
        assert_eq!(err.status(), 404);
        assert!(matches!(err.source, NportError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_cik_is_rejected_before_any_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let service = service(transport.clone(), &config());

        for input in ["", "abc", "12345678901"] {
            let err = service.resolve_holdings(input).await.unwrap_err();
            assert_eq!(err.status(), 400, "{:?}", input);
            assert_eq!(err.message(), "CIK must be up to 10 digits.");
        }
        assert_eq!(transport.total_calls(), 0);
        assert_eq!(service.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_container_is_malformed_and_not_cached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            SAMPLE_SUBMISSIONS_URL,
            StatusCode::OK,
            SAMPLE_SUBMISSIONS_JSON,
        );
        transport.respond(
            SAMPLE_DOCUMENT_URL,
            StatusCode::OK,
            "<edgarSubmission><formData><genInfo/></formData></edgarSubmission>",
        );
        let service = service(transport.clone(), &config());

        let err = service.resolve_holdings(SAMPLE_CIK).await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Parsing);
        assert_eq!(err.status(), 502);
        assert!(matches!(err.source, NportError::MalformedDocument(_)));

        service.resolve_holdings(SAMPLE_CIK).await.unwrap_err();
        assert_eq!(service.fetch_count(), 2);
        assert_eq!(service.cache().stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_container_is_an_empty_result() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            SAMPLE_SUBMISSIONS_URL,
            StatusCode::OK,
            SAMPLE_SUBMISSIONS_JSON,
        );
        transport.respond(
            SAMPLE_DOCUMENT_URL,
            StatusCode::OK,
            "<edgarSubmission><formData><invstOrSecs/></formData></edgarSubmission>",
        );
        let service = service(transport, &config());

        let result = service.resolve_holdings(SAMPLE_CIK).await.unwrap();
        assert_eq!(result.count, 0);
        assert!(result.holdings.is_empty());
        assert_eq!(result.total_value_usd, Some(Decimal::ZERO));
        assert_eq!(result.as_of.as_deref(), Some("2025-06-30"));
        assert_eq!(result.fund_name.as_deref(), Some("SPDR S&P 500 ETF TRUST"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_respect_outbound_rate() {
        let transport = Arc::new(ScriptedTransport::with_sample_filing());
        let config = PipelineConfig {
            requests_per_second: 2.0,
            ..config()
        };
        let service = service(transport.clone(), &config);

        let lookups = (0..4).map(|_| service.resolve_holdings(SAMPLE_CIK));
        let results = futures::future::join_all(lookups).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let mut times: Vec<_> = transport.calls().into_iter().map(|c| c.at).collect();
        times.sort();
        assert_eq!(times.len(), 8);
        for window in times.windows(3) {
            let span = window[2].duration_since(window[0]);
            assert!(span >= Duration::from_millis(998), "window spanned {:?}", span);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_upstream_fails_at_lookup_deadline() {
        let transport = Arc::new(
            ScriptedTransport::with_sample_filing().with_latency(Duration::from_secs(10)),
        );
        let config = PipelineConfig {
            lookup_timeout: Duration::from_secs(15),
            ..config()
        };
        let service = service(transport.clone(), &config);

        let started = Instant::now();
        let err = service.resolve_holdings(SAMPLE_CIK).await.unwrap_err();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
        assert_eq!(err.stage, PipelineStage::Fetching);
        assert_eq!(err.status(), 502);
        assert!(matches!(err.source, NportError::UpstreamUnavailable(_)));
        assert_eq!(service.cache().stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflowing_total_is_reported_as_unknown() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            SAMPLE_SUBMISSIONS_URL,
            StatusCode::OK,
            SAMPLE_SUBMISSIONS_JSON,
        );
        let position = "<invstOrSec><name>Big</name><cusip>111111111</cusip><valUSD>60000000000000000000000000000</valUSD></invstOrSec>";
        transport.respond(
            SAMPLE_DOCUMENT_URL,
            StatusCode::OK,
            &format!(
                "<edgarSubmission><formData><invstOrSecs>{}{}</invstOrSecs></formData></edgarSubmission>",
                position, position
            ),
        );
        let service = service(transport, &config());

        let result = service.resolve_holdings(SAMPLE_CIK).await.unwrap();
        assert_eq!(result.count, 2);
        assert_eq!(result.total_value_usd, None);
        assert!(result.holdings.iter().all(|h| h.percent_value.is_none()));
    }

    #[test]
    fn test_from_config_requires_contact_user_agent() {
        let config = PipelineConfig {
            user_agent: "curl/8.0".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            HoldingsService::from_config(&config),
            Err(NportError::Config(_))
        ));
    }
}
