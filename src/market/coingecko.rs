//! `CoinGecko` REST client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{CoinEntry, MarketDataSource, MarketSnapshot};
use crate::config::CoinGeckoConfig;
use crate::error::Result;
use crate::http::ensure_success;

const SERVICE: &str = "CoinGecko";

/// Market data from the public `CoinGecko` API.
pub struct CoinGeckoClient {
    client: Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoClient {
    /// Create a client for the configured endpoints.
    pub fn new(client: Client, config: CoinGeckoConfig) -> Self {
        Self { client, config }
    }

    fn parse_market_data(data: &Value) -> MarketSnapshot {
        let market = &data["market_data"];
        let usd = |field: &str| market[field]["usd"].as_f64().unwrap_or(0.0);
        MarketSnapshot {
            market_cap: usd("market_cap"),
            price: usd("current_price"),
            volume: usd("total_volume"),
        }
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_coin_list(&self) -> Result<Vec<CoinEntry>> {
        debug!(url = %self.config.coins_list_url, "Fetching CoinGecko coins list");
        let response = self.client.get(&self.config.coins_list_url).send().await?;
        let coins = ensure_success(SERVICE, response)?
            .json::<Vec<CoinEntry>>()
            .await?;
        debug!(coins = coins.len(), "Fetched CoinGecko coins list");
        Ok(coins)
    }

    async fn fetch_market_data(&self, coin_id: &str) -> Result<MarketSnapshot> {
        let url = self.config.coin_url(coin_id);
        let response = self.client.get(url).send().await?;
        let data = ensure_success(SERVICE, response)?.json::<Value>().await?;
        Ok(Self::parse_market_data(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_market_data() {
        let data = json!({
            "id": "pepe",
            "market_data": {
                "current_price": {"usd": 0.00000951, "eur": 0.0000088},
                "market_cap": {"usd": 4001234567.0},
                "total_volume": {"usd": 750000000}
            }
        });
        let snapshot = CoinGeckoClient::parse_market_data(&data);
        assert_eq!(snapshot.price, 0.000_009_51);
        assert_eq!(snapshot.market_cap, 4_001_234_567.0);
        assert_eq!(snapshot.volume, 750_000_000.0);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let data = json!({
            "id": "fresh-token",
            "market_data": {"current_price": {"usd": 1.25}, "market_cap": {}}
        });
        let snapshot = CoinGeckoClient::parse_market_data(&data);
        assert_eq!(
            snapshot,
            MarketSnapshot {
                market_cap: 0.0,
                price: 1.25,
                volume: 0.0
            }
        );

        assert_eq!(
            CoinGeckoClient::parse_market_data(&json!({})),
            MarketSnapshot::default()
        );
    }
}
