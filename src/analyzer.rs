//! Token analysis pipeline
//!
//! `get_or_compute` is the single entry point used by the bot and the map
//! view. A cached record is returned as is. On a miss the market data is
//! resolved (best effort), the transfer graph and map metadata are fetched
//! (both required), the graph is aggregated and the assembled record is
//! stored.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::bubblemaps::{BubblemapsClient, MapSource};
use crate::config::Config;
use crate::graph::aggregate;
use crate::http::build_client;
use crate::market::{CoinCatalog, CoinGeckoClient, MarketResolver, MarketSnapshot};
use crate::store::{self, TokenStore};
use crate::token::{Chain, TokenRecord, record_key};
use crate::{Error, Result};

/// Computes token records and caches them in a [`TokenStore`]
pub struct TokenAnalyzer {
    store: Arc<dyn TokenStore>,
    market: MarketResolver,
    maps: Arc<dyn MapSource>,
}

impl TokenAnalyzer {
    /// Assemble an analyzer from its collaborators
    pub fn new(store: Arc<dyn TokenStore>, market: MarketResolver, maps: Arc<dyn MapSource>) -> Self {
        Self { store, market, maps }
    }

    /// Wire the HTTP clients and the store described by `config`
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate_sources()?;

        let client = build_client(&config.http)?;
        let coingecko = Arc::new(CoinGeckoClient::new(client.clone(), config.coingecko.clone()));
        let catalog = Arc::new(CoinCatalog::new(coingecko.clone()));
        let market = MarketResolver::new(catalog, coingecko);
        let maps = Arc::new(BubblemapsClient::new(client, config.bubblemaps.clone()));
        let store = store::open(&config.store).await?;

        Ok(Self::new(store, market, maps))
    }

    /// Return the cached record for `(contract_address, chain)`, computing
    /// and storing it on a miss.
    ///
    /// # Errors
    ///
    /// [`Error::ComputationFailed`] when the transfer graph or the map
    /// metadata cannot be fetched, or when an aggregated figure is not
    /// finite; nothing is stored in that case. Store
    /// errors are passed through.
    pub async fn get_or_compute(&self, contract_address: &str, chain: Chain) -> Result<TokenRecord> {
        if let Some(record) = self.store.find(contract_address, chain).await? {
            info!(address = %contract_address, chain = %chain, "Using cached data");
            return Ok(record);
        }

        let key = record_key(contract_address, chain);
        let record = self
            .compute(contract_address, chain)
            .await
            .and_then(|record| match record.non_finite_field() {
                Some(field) => Err(Error::InvalidRecord(format!("{field} is not finite"))),
                None => Ok(record),
            })
            .map_err(|e| Error::computation_failed(key, e))?;

        match self.store.insert(record).await {
            Ok(record) => {
                info!(address = %contract_address, chain = %chain, "Token data cached");
                Ok(record)
            }
            // A concurrent request stored the key first: serve its record
            Err(Error::DuplicateKey { key }) => {
                debug!(key = %key, "Record stored concurrently, reading back");
                self.store
                    .find(contract_address, chain)
                    .await?
                    .ok_or(Error::DuplicateKey { key })
            }
            Err(e) => Err(e),
        }
    }

    async fn compute(&self, contract_address: &str, chain: Chain) -> Result<TokenRecord> {
        info!(address = %contract_address, chain = %chain, "Analysing token");

        let market = match self.market.resolve(contract_address, chain.as_str()).await {
            Some(snapshot) => snapshot,
            None => {
                info!("No CoinGecko data found, using defaults: market_cap=0, price=0, volume=0");
                MarketSnapshot::default()
            }
        };

        let graph = self.maps.fetch_transfer_graph(contract_address, chain).await?;
        let metadata = self.maps.fetch_map_metadata(contract_address, chain).await?;
        let summary = aggregate(&graph);

        debug!(
            top_traders = summary.top_traders.len(),
            connections = summary.trader_connections.len(),
            "Aggregated transfer graph"
        );

        Ok(TokenRecord {
            contract_address: contract_address.to_string(),
            chain,
            market_cap: market.market_cap,
            price: market.price,
            volume: market.volume,
            decentralization_score: metadata.decentralization_score,
            percent_in_cexs: metadata.percent_in_cexs,
            percent_in_contracts: metadata.percent_in_contracts,
            top_traders: summary.top_traders,
            trader_connections: summary.trader_connections,
            cached_at: Utc::now(),
        })
    }
}
