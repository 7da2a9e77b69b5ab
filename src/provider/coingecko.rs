//! CoinGecko market-data provider
//!
//! Implements the MarketDataProvider trait over the CoinGecko REST API:
//! - `/coins/{id}/market_chart` for price series
//! - `/simple/price` for spot prices
//! - `/coins/markets` for the tradable-symbol listing
//!
//! HTTP failures are normalized into the provider error taxonomy: 429 and
//! 5xx responses (and transport errors) are transient, 404 means the symbol
//! is unknown, anything else unexpected is a malformed response.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::Interval;
use crate::provider::errors::{ProviderError, ProviderResult};
use crate::provider::rate_limit::RateBudget;
use crate::provider::traits::MarketDataProvider;
use crate::provider::types::{MarketSymbol, PricePoint};

/// Public API base URL
const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Request timeout for provider calls
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Listing page size (provider maximum)
const LISTING_PER_PAGE: usize = 250;

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// Pairs of (unix ms timestamp, price)
    prices: Vec<(f64, f64)>,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    current_price: Option<f64>,
    market_cap: Option<f64>,
}

// =============================================================================
// Provider
// =============================================================================

/// CoinGecko-backed market-data provider
pub struct CoinGeckoProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    budget: RateBudget,
}

impl CoinGeckoProvider {
    pub fn new(api_key: Option<String>, budget: RateBudget) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            budget,
        }
    }

    /// Override the API base URL (used by tests against a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Issue a budget-governed GET and classify the response status.
    async fn get_checked(&self, url: String, symbol: &str) -> ProviderResult<reqwest::Response> {
        self.budget.acquire().await;

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(ProviderError::Transient(format!(
                "provider answered {} for {}",
                status, symbol
            )));
        }
        let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
        Err(ProviderError::InvalidResponse(format!(
            "unexpected status {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        window: usize,
    ) -> ProviderResult<Vec<PricePoint>> {
        if window == 0 {
            return Err(ProviderError::InvalidResponse(
                "requested series for a zero-sample window".to_string(),
            ));
        }

        let days = interval.days_spanning(window);
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}&interval={}",
            self.base_url, symbol, days, interval
        );
        debug!(symbol = %symbol, days, interval = %interval, "fetching price series");

        let response = self.get_checked(url, symbol).await?;
        let chart: MarketChartResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("market_chart: {}", e)))?;

        Ok(chart
            .prices
            .into_iter()
            .map(|(timestamp_ms, price)| PricePoint {
                timestamp_ms: timestamp_ms as u64,
                price,
            })
            .collect())
    }

    async fn fetch_spot_price(&self, symbol: &str) -> ProviderResult<f64> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url, symbol
        );

        let response = self.get_checked(url, symbol).await?;
        let prices: HashMap<String, HashMap<String, f64>> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("simple/price: {}", e)))?;

        // CoinGecko answers 200 with an empty object for unknown ids
        prices
            .get(symbol)
            .and_then(|quotes| quotes.get("usd"))
            .copied()
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }

    async fn list_symbols(&self, quote: &str) -> ProviderResult<Vec<MarketSymbol>> {
        let url = format!(
            "{}/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page=1",
            self.base_url, quote, LISTING_PER_PAGE
        );

        let response = self.get_checked(url, "market listing").await?;
        let rows: Vec<MarketRow> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("coins/markets: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|row| MarketSymbol {
                id: row.id,
                price: row.current_price.unwrap_or(0.0),
                market_cap: row.market_cap,
            })
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_for(server: &mockito::ServerGuard) -> CoinGeckoProvider {
        CoinGeckoProvider::new(None, RateBudget::new(1000)).with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_fetch_series_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/coins/bitcoin/market_chart?vs_currency=usd&days=17&interval=4h",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"prices":[[1700000000000,100.0],[1700014400000,101.5]]}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let series = provider
            .fetch_series("bitcoin", Interval::H4, 99)
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].timestamp_ms, 1_700_000_000_000);
        assert_eq!(series[1].price, 101.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_series_zero_window_rejected() {
        let server = mockito::Server::new_async().await;
        let provider = provider_for(&server);

        let result = provider.fetch_series("bitcoin", Interval::H4, 0).await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_rate_limited_response_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/coins/bitcoin/market_chart.*$".to_string()),
            )
            .with_status(429)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider.fetch_series("bitcoin", Interval::H4, 99).await;

        match result {
            Err(e) => assert!(e.is_transient()),
            Ok(_) => panic!("expected transient error for 429"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/simple/price.*$".to_string()),
            )
            .with_status(503)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider.fetch_spot_price("bitcoin").await;
        assert!(matches!(result, Err(ProviderError::Transient(_))));
    }

    #[tokio::test]
    async fn test_not_found_status_classified() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/coins/delisted-coin/market_chart.*$".to_string()),
            )
            .with_status(404)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider
            .fetch_series("delisted-coin", Interval::H1, 10)
            .await;
        assert!(matches!(result, Err(ProviderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_spot_price_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                "/simple/price?ids=bitcoin&vs_currencies=usd",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"bitcoin":{"usd":50123.45}}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let price = provider.fetch_spot_price("bitcoin").await.unwrap();
        assert_eq!(price, 50123.45);
    }

    #[tokio::test]
    async fn test_unknown_id_in_spot_response_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/simple/price.*$".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider.fetch_spot_price("no-such-coin").await;
        assert!(matches!(result, Err(ProviderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_symbols_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/coins/markets.*$".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"id":"bitcoin","current_price":50000.0,"market_cap":1000000000.0},
                    {"id":"ethereum","current_price":3000.0,"market_cap":400000000.0},
                    {"id":"newcoin","current_price":null,"market_cap":null}
                ]"#,
            )
            .create_async()
            .await;

        let provider = provider_for(&server);
        let rows = provider.list_symbols("usd").await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, "bitcoin");
        assert_eq!(rows[2].price, 0.0);
        assert!(rows[2].market_cap.is_none());
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/coins/bitcoin/market_chart.*$".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider.fetch_series("bitcoin", Interval::H4, 99).await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_calls_consume_rate_budget() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/simple/price.*$".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"bitcoin":{"usd":1.0}}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        provider.fetch_spot_price("bitcoin").await.unwrap();
        assert_eq!(provider.budget.used().await, 1);
    }
}
