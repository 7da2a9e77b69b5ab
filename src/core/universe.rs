//! Symbol-universe resolution
//!
//! Builds the watch list from the provider's market listing: stable-value
//! assets are excluded by a configurable substring list, the remainder is
//! ranked by market capitalization or price, and the result is truncated to
//! the configured maximum size.

use tracing::debug;

use crate::config::{RankBy, UniverseConfig};
use crate::provider::errors::ProviderResult;
use crate::provider::traits::MarketDataProvider;
use crate::provider::types::MarketSymbol;

/// Resolves the bounded watch list for the polling loop
pub struct UniverseResolver {
    config: UniverseConfig,
}

impl UniverseResolver {
    pub fn new(config: UniverseConfig) -> Self {
        Self { config }
    }

    /// Fetch, filter, rank and truncate the tradable-symbol universe.
    ///
    /// Ranking by live price is order-unstable across ties and concurrent
    /// price movement; acceptable here since the result only decides
    /// watch-list membership.
    pub async fn resolve(&self, provider: &dyn MarketDataProvider) -> ProviderResult<Vec<String>> {
        let listing = provider.list_symbols(&self.config.quote).await?;
        let total = listing.len();

        let mut candidates: Vec<MarketSymbol> = listing
            .into_iter()
            .filter(|row| !self.is_excluded(&row.id))
            .collect();

        candidates.sort_by(|a, b| {
            let (ka, kb) = match self.config.rank_by {
                RankBy::MarketCap => (a.market_cap.unwrap_or(0.0), b.market_cap.unwrap_or(0.0)),
                RankBy::Price => (a.price, b.price),
            };
            kb.total_cmp(&ka)
        });
        candidates.truncate(self.config.top_n);

        debug!(
            listed = total,
            kept = candidates.len(),
            top_n = self.config.top_n,
            "resolved symbol universe"
        );

        Ok(candidates.into_iter().map(|row| row.id).collect())
    }

    /// Substring match against the stable-asset exclusion list.
    ///
    /// Inherited heuristic: matching "usd" anywhere in the id both
    /// over-excludes (e.g. ids merely mentioning usd) and under-excludes
    /// (stable assets not quoted in usd). The list is configurable so
    /// deployments can tighten it.
    fn is_excluded(&self, id: &str) -> bool {
        self.config.exclude.iter().any(|pattern| id.contains(pattern))
    }
}

// ============================================================================
// Tests
// ============================================================================
