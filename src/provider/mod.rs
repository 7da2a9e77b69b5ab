//! Market-data provider gateway
//!
//! This module provides the core abstraction for fetching price data from
//! an external market-data API. The `MarketDataProvider` trait carries the
//! full capability set (price series, spot price, market listing) so that
//! concrete providers can be swapped at configuration time. All outbound
//! calls share a global request-rate governor.

pub mod coingecko;
pub mod errors;
pub mod rate_limit;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use coingecko::CoinGeckoProvider;
pub use errors::{ProviderError, ProviderResult};
pub use rate_limit::RateBudget;
pub use traits::MarketDataProvider;
pub use types::{MarketSymbol, PricePoint};
