//! Bubblemaps map-data and map-metadata client
//!
//! Map data carries the transfer graph of a token; map metadata carries the
//! decentralisation score and the identified supply split. Both are hard
//! requirements of an analysis: any failure here aborts it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::BubblemapsConfig;
use crate::error::{Error, Result};
use crate::graph::TransferGraph;
use crate::token::Chain;

const MAP_DATA: &str = "Bubblemaps";
const MAP_METADATA: &str = "Score";

/// Decentralisation figures from the map-metadata endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MapMetadata {
    /// Decentralisation score (0-100)
    pub decentralization_score: f64,
    /// Share of supply in centralised exchanges (0-100)
    pub percent_in_cexs: f64,
    /// Share of supply in contracts (0-100)
    pub percent_in_contracts: f64,
}

/// Wire shape of the map-metadata response
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    decentralisation_score: f64,
    #[serde(default)]
    identified_supply: IdentifiedSupply,
}

#[derive(Debug, Default, Deserialize)]
struct IdentifiedSupply {
    #[serde(default)]
    percent_in_cexs: f64,
    #[serde(default)]
    percent_in_contracts: f64,
}

impl MetadataResponse {
    fn into_metadata(self) -> Result<MapMetadata> {
        if self.status.as_deref() != Some("OK") {
            return Err(Error::UpstreamRejected {
                service: MAP_METADATA,
                message: self.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        Ok(MapMetadata {
            decentralization_score: self.decentralisation_score,
            percent_in_cexs: self.identified_supply.percent_in_cexs,
            percent_in_contracts: self.identified_supply.percent_in_contracts,
        })
    }
}

/// Source of a token's transfer graph and decentralisation metadata.
#[async_trait]
pub trait MapSource: Send + Sync {
    /// Fetch the transfer graph of a token.
    async fn fetch_transfer_graph(&self, contract_address: &str, chain: Chain) -> Result<TransferGraph>;
    /// Fetch decentralisation metadata of a token.
    async fn fetch_map_metadata(&self, contract_address: &str, chain: Chain) -> Result<MapMetadata>;
}

/// HTTP client for the two Bubblemaps endpoints.
pub struct BubblemapsClient {
    client: Client,
    config: BubblemapsConfig,
}

impl BubblemapsClient {
    /// Create a client for the configured endpoints.
    pub fn new(client: Client, config: BubblemapsConfig) -> Self {
        Self { client, config }
    }

    async fn get(
        &self,
        service: &'static str,
        url: &str,
        contract_address: &str,
        chain: Chain,
    ) -> Result<reqwest::Response> {
        debug!(service, url, address = %contract_address, chain = %chain, "Sending request");
        let response = self
            .client
            .get(url)
            .query(&[("token", contract_address), ("chain", chain.as_str())])
            .send()
            .await?;

        let status = response.status();
        debug!(service, status = status.as_u16(), "Response received");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(service, status = status.as_u16(), body = %body, "API error");
        Err(Error::Upstream {
            service,
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl MapSource for BubblemapsClient {
    async fn fetch_transfer_graph(&self, contract_address: &str, chain: Chain) -> Result<TransferGraph> {
        let graph = self
            .get(MAP_DATA, &self.config.map_data_url, contract_address, chain)
            .await?
            .json::<TransferGraph>()
            .await?;
        debug!(nodes = graph.nodes.len(), links = graph.links.len(), "Fetched transfer graph");
        Ok(graph)
    }

    async fn fetch_map_metadata(&self, contract_address: &str, chain: Chain) -> Result<MapMetadata> {
        self.get(MAP_METADATA, &self.config.map_metadata_url, contract_address, chain)
            .await?
            .json::<MetadataResponse>()
            .await?
            .into_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_ok() {
        let payload = r#"{
            "status": "OK",
            "decentralisation_score": 61.27,
            "identified_supply": {"percent_in_cexs": 12.5, "percent_in_contracts": 40.02},
            "dt_update": "2025-01-01 00:00:00",
            "ts_update": 1735689600
        }"#;
        let metadata = serde_json::from_str::<MetadataResponse>(payload)
            .unwrap()
            .into_metadata()
            .unwrap();
        assert_eq!(
            metadata,
            MapMetadata {
                decentralization_score: 61.27,
                percent_in_cexs: 12.5,
                percent_in_contracts: 40.02,
            }
        );
    }

    #[test]
    fn test_metadata_missing_supply_defaults_to_zero() {
        let payload = r#"{"status": "OK", "decentralisation_score": 10}"#;
        let metadata = serde_json::from_str::<MetadataResponse>(payload)
            .unwrap()
            .into_metadata()
            .unwrap();
        assert_eq!(metadata.decentralization_score, 10.0);
        assert_eq!(metadata.percent_in_cexs, 0.0);
        assert_eq!(metadata.percent_in_contracts, 0.0);
    }

    #[test]
    fn test_metadata_rejected_status() {
        let payload = r#"{"status": "KO", "message": "Map not computed yet"}"#;
        let err = serde_json::from_str::<MetadataResponse>(payload)
            .unwrap()
            .into_metadata()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UpstreamRejected { service: "Score", ref message } if message == "Map not computed yet"
        ));
    }

    #[test]
    fn test_metadata_without_status_is_rejected() {
        let err = serde_json::from_str::<MetadataResponse>("{}")
            .unwrap()
            .into_metadata()
            .unwrap_err();
        assert_eq!(err.to_string(), "Score API error: Unknown error");
    }
}
