//! Trader graph aggregation
//!
//! Turns a token's transfer graph (wallets as nodes, directed transfer links
//! between them) into the top wallets by volume and the number of links
//! between each pair of those wallets.
//!
//! Every link credits its full `forward + backward` amount to *both* of its
//! endpoints. Pair counts are keyed by the lexically sorted address pair, so
//! `A→B` and `B→A` land in the same `"A-B"` bucket.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::token::TopTrader;

/// Number of wallets kept in the ranking
pub const TOP_TRADER_COUNT: usize = 5;

/// Wallet node of a transfer graph; its index is its position in
/// [`TransferGraph::nodes`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Wallet address
    #[serde(default)]
    pub address: String,
}

/// Directed transfer link between two nodes.
///
/// Indices are signed because they arrive untrusted from the map API; any
/// index that does not name a node causes the link to be skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferLink {
    /// Index of the sending node
    pub source: i64,
    /// Index of the receiving node
    pub target: i64,
    /// Amount moved from source to target
    #[serde(default)]
    pub forward: f64,
    /// Amount moved from target to source
    #[serde(default)]
    pub backward: f64,
}

/// Transfer graph of a token, as returned by the map-data endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferGraph {
    /// Wallets
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    /// Transfers between wallets
    #[serde(default)]
    pub links: Vec<TransferLink>,
}

impl TransferGraph {
    /// Address of the node at `index`, if the index is in range and the node
    /// carries a non-empty address
    fn address_at(&self, index: i64) -> Option<&str> {
        let node = self.nodes.get(usize::try_from(index).ok()?)?;
        (!node.address.is_empty()).then_some(node.address.as_str())
    }
}

/// Ranked traders and the links between them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraderSummary {
    /// At most [`TOP_TRADER_COUNT`] wallets, descending by volume
    pub top_traders: Vec<TopTrader>,
    /// `"{a}-{b}"` (a ≤ b) → link count, for pairs of top traders only
    pub trader_connections: BTreeMap<String, u32>,
}

/// Rank the wallets of `graph` and count the links among the top ones.
///
/// Ties keep the order in which wallets were first seen while walking the
/// links.
#[must_use]
pub fn aggregate(graph: &TransferGraph) -> TraderSummary {
    let mut volumes: Vec<(&str, f64)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut pairs: HashMap<(&str, &str), u32> = HashMap::new();
    let mut skipped = 0usize;

    for link in &graph.links {
        let (Some(source), Some(target)) =
            (graph.address_at(link.source), graph.address_at(link.target))
        else {
            skipped += 1;
            continue;
        };

        let amount = link.forward + link.backward;
        for address in [source, target] {
            let slot = *slots.entry(address).or_insert_with(|| {
                volumes.push((address, 0.0));
                volumes.len() - 1
            });
            volumes[slot].1 += amount;
        }

        let pair = if source <= target {
            (source, target)
        } else {
            (target, source)
        };
        *pairs.entry(pair).or_insert(0) += 1;
    }

    if skipped > 0 {
        debug!(
            skipped,
            links = graph.links.len(),
            "Skipped links with out-of-range node indices"
        );
    }

    // sort_by is stable: equal volumes keep first-seen order
    volumes.sort_by(|a, b| b.1.total_cmp(&a.1));
    volumes.truncate(TOP_TRADER_COUNT);

    let top: HashSet<&str> = volumes.iter().map(|(address, _)| *address).collect();
    let trader_connections = pairs
        .into_iter()
        .filter(|((a, b), _)| top.contains(a) && top.contains(b))
        .map(|((a, b), count)| (format!("{a}-{b}"), count))
        .collect();

    let top_traders = volumes
        .into_iter()
        .map(|(address, volume)| TopTrader {
            address: address.to_string(),
            volume,
        })
        .collect();

    TraderSummary {
        top_traders,
        trader_connections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph(addresses: &[&str], links: &[(i64, i64, f64, f64)]) -> TransferGraph {
        TransferGraph {
            nodes: addresses
                .iter()
                .map(|a| GraphNode {
                    address: (*a).to_string(),
                })
                .collect(),
            links: links
                .iter()
                .map(|&(source, target, forward, backward)| TransferLink {
                    source,
                    target,
                    forward,
                    backward,
                })
                .collect(),
        }
    }

    fn ranking(summary: &TraderSummary) -> Vec<(&str, f64)> {
        summary
            .top_traders
            .iter()
            .map(|t| (t.address.as_str(), t.volume))
            .collect()
    }

    fn connections(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
        entries.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_graph() {
        let summary = aggregate(&TransferGraph::default());
        assert!(summary.top_traders.is_empty());
        assert!(summary.trader_connections.is_empty());
    }

    #[test]
    fn test_nodes_without_links() {
        let summary = aggregate(&graph(&["A", "B"], &[]));
        assert_eq!(summary, TraderSummary::default());
    }

    #[test]
    fn test_three_wallet_example() {
        let g = graph(&["A", "B", "C"], &[(0, 1, 10.0, 5.0), (1, 2, 2.0, 1.0)]);
        let summary = aggregate(&g);

        assert_eq!(ranking(&summary), vec![("B", 18.0), ("A", 15.0), ("C", 3.0)]);
        assert_eq!(
            summary.trader_connections,
            connections(&[("A-B", 1), ("B-C", 1)])
        );
    }

    #[test]
    fn test_amount_credited_in_full_to_both_endpoints() {
        let summary = aggregate(&graph(&["A", "B"], &[(0, 1, 7.0, 3.0)]));
        assert_eq!(ranking(&summary), vec![("A", 10.0), ("B", 10.0)]);
    }

    #[test]
    fn test_out_of_range_link_is_skipped() {
        let g = graph(
            &["A", "B", "C"],
            &[(0, 5, 100.0, 0.0), (0, 1, 1.0, 1.0), (-1, 2, 50.0, 0.0)],
        );
        let summary = aggregate(&g);

        assert_eq!(ranking(&summary), vec![("A", 2.0), ("B", 2.0)]);
        assert_eq!(summary.trader_connections, connections(&[("A-B", 1)]));
    }

    #[test]
    fn test_node_without_address_is_skipped() {
        let g = graph(&["A", "", "C"], &[(0, 1, 4.0, 0.0), (0, 2, 1.0, 0.0)]);
        let summary = aggregate(&g);
        assert_eq!(ranking(&summary), vec![("A", 1.0), ("C", 1.0)]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let g = graph(
            &["D", "C", "B", "A"],
            &[(0, 1, 1.0, 0.0), (2, 3, 1.0, 0.0)],
        );
        let summary = aggregate(&g);
        assert_eq!(
            ranking(&summary),
            vec![("D", 1.0), ("C", 1.0), ("B", 1.0), ("A", 1.0)]
        );
    }

    #[test]
    fn test_tie_at_cut_keeps_first_seen() {
        let g = graph(
            &["A", "B", "C", "D", "E", "F"],
            &[(0, 1, 5.0, 0.0), (2, 3, 3.0, 0.0), (4, 5, 1.0, 0.0)],
        );
        let summary = aggregate(&g);

        // E and F tie for fifth place; E was seen first
        assert_eq!(
            ranking(&summary),
            vec![
                ("A", 5.0),
                ("B", 5.0),
                ("C", 3.0),
                ("D", 3.0),
                ("E", 1.0)
            ]
        );
        assert_eq!(
            summary.trader_connections,
            connections(&[("A-B", 1), ("C-D", 1)])
        );
    }

    #[test]
    fn test_connections_are_direction_independent() {
        let g = graph(
            &["B", "A"],
            &[(0, 1, 1.0, 0.0), (1, 0, 0.0, 0.0), (0, 1, 3.0, 2.0)],
        );
        let summary = aggregate(&g);
        assert_eq!(summary.trader_connections, connections(&[("A-B", 3)]));
    }

    #[test]
    fn test_keeps_only_top_five() {
        // Hub W0 links to six leaves with distinct volumes
        let addresses = ["W0", "L1", "L2", "L3", "L4", "L5", "L6"];
        let links: Vec<(i64, i64, f64, f64)> = (1..=6u8)
            .map(|i| (0, i64::from(i), f64::from(i), 0.0))
            .collect();
        let summary = aggregate(&graph(&addresses, &links));

        assert_eq!(
            ranking(&summary),
            vec![
                ("W0", 21.0),
                ("L6", 6.0),
                ("L5", 5.0),
                ("L4", 4.0),
                ("L3", 3.0)
            ]
        );
        // Links to L1 and L2 fall outside the top five
        assert_eq!(
            summary.trader_connections,
            connections(&[("L3-W0", 1), ("L4-W0", 1), ("L5-W0", 1), ("L6-W0", 1)])
        );
    }

    #[test]
    fn test_pair_outside_top_set_is_dropped() {
        let g = graph(
            &["A", "B", "C", "D", "E", "F", "G"],
            &[
                (0, 1, 100.0, 0.0),
                (2, 3, 90.0, 0.0),
                (4, 0, 80.0, 0.0),
                (5, 6, 1.0, 0.0),
            ],
        );
        let summary = aggregate(&g);

        assert_eq!(summary.top_traders.len(), TOP_TRADER_COUNT);
        assert!(!summary.trader_connections.contains_key("F-G"));
        for key in summary.trader_connections.keys() {
            let (a, b) = key.split_once('-').unwrap();
            assert!(summary.top_traders.iter().any(|t| t.address == a));
            assert!(summary.top_traders.iter().any(|t| t.address == b));
        }
    }

    #[test]
    fn test_self_transfer_counts_twice_for_wallet() {
        let summary = aggregate(&graph(&["A"], &[(0, 0, 2.0, 1.0)]));
        assert_eq!(ranking(&summary), vec![("A", 6.0)]);
        assert_eq!(summary.trader_connections, connections(&[("A-A", 1)]));
    }

    #[test]
    fn test_deserialize_map_data_payload() {
        let payload = r#"{
            "nodes": [
                {"address": "0xaaa", "amount": 12.5, "is_contract": false},
                {"address": "0xbbb"}
            ],
            "links": [
                {"source": 0, "target": 1, "forward": 3.5},
                {"source": 1, "target": 0, "backward": 1.5}
            ],
            "token_address": "0xtoken"
        }"#;
        let g: TransferGraph = serde_json::from_str(payload).unwrap();
        assert_eq!(g.nodes.len(), 2);
        assert_eq!(g.links[0].backward, 0.0);

        let summary = aggregate(&g);
        assert_eq!(ranking(&summary), vec![("0xaaa", 5.0), ("0xbbb", 5.0)]);
        assert_eq!(summary.trader_connections, connections(&[("0xaaa-0xbbb", 2)]));
    }
}
