//! In-memory result cache with TTL using moka
//!
//! Entries are keyed by normalized CIK and hold the whole [`FilingResult`]
//! of the last successful resolution. Expiry and size-bounded eviction are
//! handled by moka.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use moka::sync::Cache;

use crate::models::{Cik, FilingResult};

/// Default freshness window: 30 minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(1800);

/// Default number of issuers kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Arc<FilingResult>,
    fetched_at: Instant,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Per-CIK cache of resolved filings.
pub struct ResultCache {
    entries: Cache<Cik, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity.max(1) as u64)
                .build(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh result for a CIK. Expired entries count as a miss.
    pub fn get(&self, cik: &Cik) -> Option<Arc<FilingResult>> {
        match self.entries.get(cik) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.result)
            }
            None => {
                debug!("No fresh cache entry for {}", cik);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// When the cached result for a CIK was stored, if it is still fresh.
    pub fn fetched_at(&self, cik: &Cik) -> Option<Instant> {
        self.entries.get(cik).map(|entry| entry.fetched_at)
    }

    /// Store a result, replacing any previous entry for the CIK.
    pub fn put(&self, cik: &Cik, result: FilingResult) -> Arc<FilingResult> {
        let result = Arc::new(result);
        self.entries.insert(
            cik.clone(),
            CacheEntry {
                result: result.clone(),
                fetched_at: Instant::now(),
            },
        );
        result
    }

    pub fn invalidate(&self, cik: &Cik) {
        self.entries.invalidate(cik);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks();
        CacheStats {
            entries: self.entries.entry_count() as usize,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }
}
