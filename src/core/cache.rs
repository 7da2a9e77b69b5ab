//! Moving-average memoization
//!
//! Caches computed moving averages for the duration of a polling cycle so
//! that repeated checks of the same (symbol, interval, window) do not burn
//! provider budget. Only successful, sufficient-length series populate the
//! cache: transient provider errors propagate to the caller and
//! insufficient history is reported as absent without being memoized as a
//! negative result.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Interval;
use crate::core::ma;
use crate::provider::errors::ProviderResult;
use crate::provider::traits::MarketDataProvider;

/// Composite cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaKey {
    pub symbol: String,
    pub interval: Interval,
    pub window: usize,
    /// Samples requested from the provider for this computation
    pub samples: usize,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: f64,
    inserted_at: Instant,
}

/// TTL-aware moving-average cache
///
/// Mutated by whichever concurrent evaluation task first computes a key;
/// last write wins per key within a cycle, which is all the polling loop
/// requires.
pub struct MaCache {
    ttl: Duration,
    entries: RwLock<HashMap<MaKey, CacheEntry>>,
}

impl MaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached moving average for the key, or fetch a series and
    /// compute it.
    ///
    /// Returns `Ok(None)` when the provider has fewer than `window` samples
    /// for the symbol; this "not enough history" outcome is distinct from a
    /// provider failure and is never cached.
    pub async fn get_or_compute(
        &self,
        provider: &dyn MarketDataProvider,
        symbol: &str,
        interval: Interval,
        window: usize,
    ) -> ProviderResult<Option<f64>> {
        let key = MaKey {
            symbol: symbol.to_string(),
            interval,
            window,
            samples: window,
        };

        if let Some(entry) = self.entries.read().await.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Ok(Some(entry.value));
            }
        }

        let series = provider.fetch_series(symbol, interval, window).await?;
        let closes: Vec<f64> = series.iter().map(|p| p.price).collect();

        match ma::moving_average(&closes, window) {
            Some(value) => {
                self.entries.write().await.insert(
                    key,
                    CacheEntry {
                        value,
                        inserted_at: Instant::now(),
                    },
                );
                Ok(Some(value))
            }
            None => {
                debug!(
                    symbol = %symbol,
                    window,
                    samples = closes.len(),
                    "insufficient history for moving average"
                );
                Ok(None)
            }
        }
    }

    /// Drop expired entries. Called at the cycle boundary so the map stays
    /// bounded by the watch-list size.
    pub async fn prune_expired(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
    }

    /// Number of live entries (test/diagnostic use)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
