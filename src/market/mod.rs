//! Market data resolution
//!
//! Maps a contract address to a `CoinGecko` coin id through the coin catalog,
//! then fetches USD market data for that id. Everything here is best effort:
//! failures are logged and surface as `None`, never as errors.

pub mod catalog;
pub mod coingecko;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

pub use catalog::{CoinCatalog, CoinEntry, coingecko_platform};
pub use coingecko::CoinGeckoClient;

/// USD market figures for a token; absent upstream fields are 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Market capitalisation
    pub market_cap: f64,
    /// Current price
    pub price: f64,
    /// 24h traded volume
    pub volume: f64,
}

/// Source of the coin catalog and per-coin market data.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the full coin catalog with platform contract addresses.
    async fn fetch_coin_list(&self) -> Result<Vec<CoinEntry>>;
    /// Fetch USD market data for a coin id.
    async fn fetch_market_data(&self, coin_id: &str) -> Result<MarketSnapshot>;
}

/// Resolves `(contract address, chain)` to market data
pub struct MarketResolver {
    catalog: Arc<CoinCatalog>,
    source: Arc<dyn MarketDataSource>,
}

impl MarketResolver {
    /// Create a resolver over a shared catalog
    pub fn new(catalog: Arc<CoinCatalog>, source: Arc<dyn MarketDataSource>) -> Self {
        Self { catalog, source }
    }

    /// Resolve market data, or `None` when the token is unknown to the
    /// catalog or the market data request fails
    pub async fn resolve(&self, contract_address: &str, chain_code: &str) -> Option<MarketSnapshot> {
        let coin_id = self.catalog.coin_id(contract_address, chain_code).await?;
        info!(address = %contract_address, chain = %chain_code, coin_id = %coin_id, "Resolved CoinGecko coin id");

        match self.source.fetch_market_data(&coin_id).await {
            Ok(snapshot) => {
                info!(
                    coin_id = %coin_id,
                    market_cap = snapshot.market_cap,
                    price = snapshot.price,
                    volume = snapshot.volume,
                    "Fetched market data"
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(coin_id = %coin_id, error = %e, "Market data unavailable");
                None
            }
        }
    }
}
