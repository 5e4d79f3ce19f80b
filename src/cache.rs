//! In-memory caching using moka
//!
//! Exchange-rate lookups are cached per (pair, date). Rate history only ever
//! grows, so entries need no TTL; the resolver invalidates the cache whenever
//! a rate is recorded, since a new rate can change the answer for later dates.
//!
//! Each invalidation bumps a generation counter. A lookup that read the store
//! under an older generation must not leave its answer in the cache.

use chrono::NaiveDate;
use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::fx::ExchangeRate;
use crate::money::CurrencyCode;

/// Cache key: (from, to, query date)
pub type RateKey = (CurrencyCode, CurrencyCode, NaiveDate);

/// Engine cache holding resolved exchange rates
#[derive(Clone)]
pub struct PricingCache {
    /// Rate lookups, including misses (`None`)
    pub rates: Cache<RateKey, Option<ExchangeRate>>,
    generation: Arc<AtomicU64>,
}

impl PricingCache {
    /// Create a new cache instance bounded to `capacity` entries
    pub fn new(capacity: u64, idle: Duration) -> Self {
        Self {
            rates: Cache::builder()
                .max_capacity(capacity)
                .time_to_idle(idle)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            rates_size: self.rates.entry_count(),
        }
    }

    /// Current invalidation generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cache a lookup that started at `generation`.
    ///
    /// Nothing is kept if an invalidation happened since the lookup began,
    /// including one that lands between the insert and the re-check.
    pub async fn insert_rate_if_current(
        &self,
        key: RateKey,
        value: Option<ExchangeRate>,
        generation: u64,
    ) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.rates.insert(key.clone(), value).await;
        if self.generation() != generation {
            self.rates.invalidate(&key).await;
            return false;
        }
        true
    }

    /// Invalidate all caches
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.rates.invalidate_all();
        info!("Exchange rate cache invalidated");
    }

    /// Generate cache key for a rate lookup
    pub fn rate_key(from: &CurrencyCode, to: &CurrencyCode, date: NaiveDate) -> RateKey {
        (from.clone(), to.clone(), date)
    }
}

impl Default for PricingCache {
    fn default() -> Self {
        // 10k lookups, 1 hour idle
        Self::new(10_000, Duration::from_secs(60 * 60))
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub rates_size: u64,
}
