//! Provider data types

use serde::{Deserialize, Serialize};

/// A single (timestamp, price) sample in a price series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Sample timestamp (Unix ms)
    pub timestamp_ms: u64,
    /// Closing price in the quote currency
    pub price: f64,
}

/// One row of the tradable-symbol listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSymbol {
    /// Provider-specific symbol id (e.g. "bitcoin")
    pub id: String,
    /// Current price in the quote currency
    pub price: f64,
    /// Market capitalization, when the provider reports one
    pub market_cap: Option<f64>,
}
