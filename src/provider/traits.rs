//! Market-data provider trait
//!
//! One trait covers the full capability set the bot needs from a
//! market-data backend: historical series, spot price, and the market
//! listing used to build the watch list. Implementations are selected at
//! configuration time and shared across tasks as `Arc<dyn MarketDataProvider>`.

use async_trait::async_trait;

use crate::config::Interval;
use crate::provider::errors::ProviderResult;
use crate::provider::types::{MarketSymbol, PricePoint};

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short provider name for logging
    fn name(&self) -> &'static str;

    /// Fetch a price series for `symbol` with enough history to cover a
    /// moving average of `window` samples at `interval`.
    ///
    /// The returned series is ordered oldest-first. It may be shorter than
    /// `window` when the asset has little history; that is not an error.
    async fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        window: usize,
    ) -> ProviderResult<Vec<PricePoint>>;

    /// Fetch the current spot price for `symbol`.
    async fn fetch_spot_price(&self, symbol: &str) -> ProviderResult<f64>;

    /// Fetch the full market listing against `quote`, ordered by the
    /// provider's default ranking.
    async fn list_symbols(&self, quote: &str) -> ProviderResult<Vec<MarketSymbol>>;
}

// ============================================================================
// Test Support
// ============================================================================
