//! Lazily fetched `CoinGecko` coin catalog

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use super::MarketDataSource;

/// One catalog entry: a coin id and its contract address per platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinEntry {
    /// `CoinGecko` coin id
    pub id: String,
    /// Platform name → contract address (`null` for unlisted platforms)
    #[serde(default)]
    pub platforms: HashMap<String, Option<String>>,
}

/// `CoinGecko` platform name for a Bubblemaps chain code
#[must_use]
pub fn coingecko_platform(chain_code: &str) -> Option<&'static str> {
    match chain_code {
        "eth" => Some("ethereum"),
        "bsc" => Some("binance-smart-chain"),
        "ftm" => Some("fantom"),
        "avax" => Some("avalanche"),
        "cro" => Some("cronos"),
        "arbi" => Some("arbitrum"),
        "poly" => Some("polygon-pos"),
        "base" => Some("base"),
        "sol" => Some("solana"),
        "sonic" => Some("sonic"),
        _ => None,
    }
}

/// Process-wide coin catalog.
///
/// The list is fetched on first use and kept for the life of the process.
/// A failed fetch leaves the cell empty, so the next lookup fetches again.
/// Concurrent first lookups wait on a single fetch.
pub struct CoinCatalog {
    source: Arc<dyn MarketDataSource>,
    coins: OnceCell<Vec<CoinEntry>>,
}

impl CoinCatalog {
    /// Create an empty catalog backed by `source`
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            coins: OnceCell::new(),
        }
    }

    /// Whether the catalog has been fetched
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.coins.initialized()
    }

    /// Coin id whose contract on `chain_code`'s platform equals
    /// `contract_address` exactly. First match wins.
    pub async fn coin_id(&self, contract_address: &str, chain_code: &str) -> Option<String> {
        let Some(platform) = coingecko_platform(chain_code) else {
            warn!(chain = %chain_code, "Unsupported chain");
            return None;
        };

        let coins = match self
            .coins
            .get_or_try_init(|| self.source.fetch_coin_list())
            .await
        {
            Ok(coins) => coins,
            Err(e) => {
                error!(error = %e, "CoinGecko coins list unavailable");
                return None;
            }
        };

        let found = coins
            .iter()
            .find(|coin| {
                coin.platforms
                    .get(platform)
                    .and_then(Option::as_deref)
                    == Some(contract_address)
            })
            .map(|coin| coin.id.clone());

        if found.is_none() {
            debug!(
                address = %contract_address,
                chain = %chain_code,
                "No CoinGecko coin found for contract address"
            );
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::market::MarketSnapshot;
    use crate::{Error, Result};

    /// Fails the first `failures` catalog fetches, then serves `coins`
    struct FlakyCatalog {
        coins: Vec<CoinEntry>,
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataSource for FlakyCatalog {
        async fn fetch_coin_list(&self) -> Result<Vec<CoinEntry>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(Error::Upstream {
                    service: "CoinGecko",
                    status: 503,
                })
            } else {
                Ok(self.coins.clone())
            }
        }

        async fn fetch_market_data(&self, _coin_id: &str) -> Result<MarketSnapshot> {
            Ok(MarketSnapshot::default())
        }
    }

    fn entry(id: &str, platforms: &[(&str, Option<&str>)]) -> CoinEntry {
        CoinEntry {
            id: id.to_string(),
            platforms: platforms
                .iter()
                .map(|(p, a)| ((*p).to_string(), a.map(str::to_string)))
                .collect(),
        }
    }

    fn catalog_with(coins: Vec<CoinEntry>, failures: usize) -> (CoinCatalog, Arc<FlakyCatalog>) {
        let source = Arc::new(FlakyCatalog {
            coins,
            failures,
            calls: AtomicUsize::new(0),
        });
        (CoinCatalog::new(source.clone()), source)
    }

    #[test]
    fn test_platform_table() {
        assert_eq!(coingecko_platform("eth"), Some("ethereum"));
        assert_eq!(coingecko_platform("bsc"), Some("binance-smart-chain"));
        assert_eq!(coingecko_platform("poly"), Some("polygon-pos"));
        assert_eq!(coingecko_platform("arbi"), Some("arbitrum"));
        assert_eq!(coingecko_platform("doge"), None);
    }

    #[test]
    fn test_every_chain_has_a_platform() {
        for chain in crate::token::Chain::ALL {
            assert!(coingecko_platform(chain.as_str()).is_some(), "{chain}");
        }
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let (catalog, _) = catalog_with(
            vec![
                entry("bridged-usdc", &[("ethereum", Some("0xa0b8"))]),
                entry("usd-coin", &[("ethereum", Some("0xa0b8"))]),
            ],
            0,
        );
        assert_eq!(
            catalog.coin_id("0xa0b8", "eth").await.as_deref(),
            Some("bridged-usdc")
        );
    }

    #[tokio::test]
    async fn test_match_is_case_sensitive_and_per_platform() {
        let (catalog, _) = catalog_with(
            vec![entry(
                "wrapped-bitcoin",
                &[("ethereum", Some("0x2260fac5")), ("solana", None)],
            )],
            0,
        );
        assert!(catalog.coin_id("0x2260FAC5", "eth").await.is_none());
        assert!(catalog.coin_id("0x2260fac5", "bsc").await.is_none());
        assert!(catalog.coin_id("0x2260fac5", "sol").await.is_none());
        assert_eq!(
            catalog.coin_id("0x2260fac5", "eth").await.as_deref(),
            Some("wrapped-bitcoin")
        );
    }

    #[tokio::test]
    async fn test_catalog_fetched_once() {
        let (catalog, source) = catalog_with(vec![entry("a", &[("base", Some("0x1"))])], 0);
        for _ in 0..3 {
            catalog.coin_id("0x1", "base").await;
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(catalog.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_on_next_lookup() {
        let (catalog, source) = catalog_with(vec![entry("a", &[("base", Some("0x1"))])], 1);

        assert!(catalog.coin_id("0x1", "base").await.is_none());
        assert!(!catalog.is_loaded());

        assert_eq!(catalog.coin_id("0x1", "base").await.as_deref(), Some("a"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unsupported_chain_does_not_fetch() {
        let (catalog, source) = catalog_with(vec![], 0);
        assert!(catalog.coin_id("0x1", "doge").await.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deserialize_coins_list() {
        let payload = r#"[
            {"id": "0chain", "symbol": "zcn", "name": "Zus",
             "platforms": {"ethereum": "0xb9ef770b6a5e12e45983c5d80545258aa38f3b78", "polygon-pos": ""}},
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "platforms": {}},
            {"id": "odd", "platforms": {"solana": null}}
        ]"#;
        let coins: Vec<CoinEntry> = serde_json::from_str(payload).unwrap();
        assert_eq!(coins.len(), 3);
        assert_eq!(coins[2].platforms.get("solana"), Some(&None));
    }
}
