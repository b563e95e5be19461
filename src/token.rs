//! Token data models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Supported blockchain networks, by their Bubblemaps chain code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Ethereum mainnet
    #[default]
    Eth,
    /// BNB Smart Chain
    Bsc,
    /// Fantom
    Ftm,
    /// Avalanche C-Chain
    Avax,
    /// Cronos
    Cro,
    /// Arbitrum One
    Arbi,
    /// Polygon PoS
    Poly,
    /// Base
    Base,
    /// Solana
    Sol,
    /// Sonic
    Sonic,
}

impl Chain {
    /// Every supported chain, in display order
    pub const ALL: [Chain; 10] = [
        Chain::Eth,
        Chain::Bsc,
        Chain::Ftm,
        Chain::Avax,
        Chain::Cro,
        Chain::Arbi,
        Chain::Poly,
        Chain::Base,
        Chain::Sol,
        Chain::Sonic,
    ];

    /// Chain code as used by the Bubblemaps APIs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::Bsc => "bsc",
            Self::Ftm => "ftm",
            Self::Avax => "avax",
            Self::Cro => "cro",
            Self::Arbi => "arbi",
            Self::Poly => "poly",
            Self::Base => "base",
            Self::Sol => "sol",
            Self::Sonic => "sonic",
        }
    }

    /// Comma separated list of every chain code
    #[must_use]
    pub fn supported_codes() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnsupportedChain(s.to_string()))
    }
}

/// A wallet ranked by aggregated transfer volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTrader {
    /// Wallet address
    pub address: String,
    /// Sum of forward and backward amounts over every link touching the wallet
    pub volume: f64,
}

/// Cached analysis of one token on one chain.
///
/// Records are written once and never updated; `(chain, contract_address)`
/// identifies a record uniquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Token contract address, exactly as supplied by the caller
    pub contract_address: String,
    /// Chain the token lives on
    pub chain: Chain,
    /// Market capitalisation in USD (0 when unknown)
    #[serde(default)]
    pub market_cap: f64,
    /// Price in USD (0 when unknown)
    #[serde(default)]
    pub price: f64,
    /// 24h volume in USD (0 when unknown)
    #[serde(default)]
    pub volume: f64,
    /// Bubblemaps decentralisation score (0-100)
    #[serde(default)]
    pub decentralization_score: f64,
    /// Share of supply held by centralised exchanges (0-100)
    #[serde(default)]
    pub percent_in_cexs: f64,
    /// Share of supply held by contracts (0-100)
    #[serde(default)]
    pub percent_in_contracts: f64,
    /// Top wallets, descending by volume
    #[serde(default)]
    pub top_traders: Vec<TopTrader>,
    /// `"{wallet1}-{wallet2}"` → number of links between two top traders
    #[serde(default)]
    pub trader_connections: BTreeMap<String, u32>,
    /// When the record was computed
    pub cached_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Store key for this record
    #[must_use]
    pub fn key(&self) -> String {
        record_key(&self.contract_address, self.chain)
    }

    /// Name of the first numeric field that is NaN or infinite.
    ///
    /// JSON has no encoding for such values, so a record carrying one
    /// cannot be stored and read back.
    #[must_use]
    pub fn non_finite_field(&self) -> Option<String> {
        let scalars = [
            ("market_cap", self.market_cap),
            ("price", self.price),
            ("volume", self.volume),
            ("decentralization_score", self.decentralization_score),
            ("percent_in_cexs", self.percent_in_cexs),
            ("percent_in_contracts", self.percent_in_contracts),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Some((*name).to_string());
        }
        self.top_traders
            .iter()
            .find(|t| !t.volume.is_finite())
            .map(|t| format!("top_traders[{}].volume", t.address))
    }
}

/// Build the store key for `(address, chain)`
#[must_use]
pub fn record_key(contract_address: &str, chain: Chain) -> String {
    format!("{chain}:{contract_address}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_round_trip_codes() {
        for chain in Chain::ALL {
            assert_eq!(chain.as_str().parse::<Chain>().unwrap(), chain);
        }
    }

    #[test]
    fn test_chain_rejects_unknown_code() {
        let err = "doge".parse::<Chain>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedChain(ref c) if c == "doge"));
    }

    #[test]
    fn test_chain_codes_are_case_sensitive() {
        assert!("ETH".parse::<Chain>().is_err());
    }

    #[test]
    fn test_chain_defaults_to_eth() {
        assert_eq!(Chain::default(), Chain::Eth);
    }

    #[test]
    fn test_chain_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Chain::Arbi).unwrap(), "\"arbi\"");
        let chain: Chain = serde_json::from_str("\"poly\"").unwrap();
        assert_eq!(chain, Chain::Poly);
    }

    #[test]
    fn test_record_key_format() {
        assert_eq!(record_key("0xAbC", Chain::Bsc), "bsc:0xAbC");
    }

    #[test]
    fn test_non_finite_field_detection() {
        let mut record = TokenRecord {
            contract_address: "0xabc".to_string(),
            chain: Chain::Eth,
            market_cap: 1.0,
            price: 2.0,
            volume: 3.0,
            decentralization_score: 40.0,
            percent_in_cexs: 1.0,
            percent_in_contracts: 2.0,
            top_traders: vec![TopTrader {
                address: "0xw1".to_string(),
                volume: 5.0,
            }],
            trader_connections: BTreeMap::new(),
            cached_at: Utc::now(),
        };
        assert_eq!(record.non_finite_field(), None);

        record.top_traders[0].volume = f64::INFINITY;
        assert_eq!(
            record.non_finite_field().as_deref(),
            Some("top_traders[0xw1].volume")
        );

        record.price = f64::NAN;
        assert_eq!(record.non_finite_field().as_deref(), Some("price"));
    }

    #[test]
    fn test_supported_codes_lists_all() {
        let codes = Chain::supported_codes();
        assert!(codes.starts_with("eth, bsc"));
        assert!(codes.ends_with("sonic"));
    }
}
