//! Portable record form of the Markov process graph.
//!
//! A self-describing JSON-compatible envelope: a type tag, a semantic
//! version, and a payload of nodes, edges, and scoring addresses
//! keyed by raw address strings. Deserialization rejects unknown
//! types and versions; the payload itself is trusted and not
//! re-validated for stochasticity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalDigest;
use crate::error::CredGraphError;
use crate::markov::MarkovProcessGraph;
use crate::types::{EdgeAddress, MarkovEdge, MarkovNode, NodeAddress};
use crate::{MARKOV_PROCESS_GRAPH_JSON_TYPE, MARKOV_PROCESS_GRAPH_VERSION};

/// One node of the portable payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Raw address string.
    pub address: String,
    /// Node description.
    pub description: String,
    /// Mint weight.
    pub mint: f64,
}

/// One edge of the portable payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Raw underlying edge address string.
    pub address: String,
    /// Whether this is the backward half of its input edge.
    pub reversed: bool,
    /// Raw source node address string.
    pub src: String,
    /// Raw destination node address string.
    pub dst: String,
    /// Transition probability.
    #[serde(rename = "transitionProbability")]
    pub transition_probability: f64,
}

/// Payload of the portable record form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovProcessGraphPayload {
    /// Nodes keyed by raw node address.
    pub nodes: BTreeMap<String, NodeRecord>,
    /// Edges keyed by raw markov edge address (direction tag first).
    pub edges: BTreeMap<String, EdgeRecord>,
    /// Raw scoring node addresses, in canonical order.
    #[serde(rename = "scoringAddresses")]
    pub scoring_addresses: Vec<String>,
}

/// Self-describing portable record: type tag, version, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovProcessGraphRecord {
    /// Always [`MARKOV_PROCESS_GRAPH_JSON_TYPE`].
    #[serde(rename = "type")]
    pub record_type: String,
    /// Semantic version of the payload shape.
    pub version: String,
    /// The graph content.
    pub payload: MarkovProcessGraphPayload,
}

impl MarkovProcessGraph {
    /// Serialize to the portable record form.
    pub fn to_record(&self) -> MarkovProcessGraphRecord {
        let nodes = self
            .nodes()
            .map(|node| {
                (
                    node.address.to_raw(),
                    NodeRecord {
                        address: node.address.to_raw(),
                        description: node.description.clone(),
                        mint: node.mint,
                    },
                )
            })
            .collect();
        let edges = self
            .edges()
            .map(|edge| {
                (
                    edge.key().to_raw(),
                    EdgeRecord {
                        address: edge.address.to_raw(),
                        reversed: edge.reversed,
                        src: edge.src.to_raw(),
                        dst: edge.dst.to_raw(),
                        transition_probability: edge.transition_probability,
                    },
                )
            })
            .collect();
        let scoring_addresses = self
            .scoring_addresses()
            .iter()
            .map(NodeAddress::to_raw)
            .collect();

        MarkovProcessGraphRecord {
            record_type: MARKOV_PROCESS_GRAPH_JSON_TYPE.to_string(),
            version: MARKOV_PROCESS_GRAPH_VERSION.to_string(),
            payload: MarkovProcessGraphPayload {
                nodes,
                edges,
                scoring_addresses,
            },
        }
    }

    /// Deserialize from the portable record form.
    ///
    /// Rejects records whose type tag differs or whose version is
    /// unknown.
    pub fn from_record(record: &MarkovProcessGraphRecord) -> Result<Self, CredGraphError> {
        if record.record_type != MARKOV_PROCESS_GRAPH_JSON_TYPE {
            return Err(CredGraphError::Configuration(format!(
                "unexpected record type: {:?}",
                record.record_type
            )));
        }
        if record.version != MARKOV_PROCESS_GRAPH_VERSION {
            return Err(CredGraphError::Configuration(format!(
                "unknown record version: {:?}",
                record.version
            )));
        }

        let mut nodes = BTreeMap::new();
        for node_record in record.payload.nodes.values() {
            let address = NodeAddress::from_raw(&node_record.address);
            nodes.insert(
                address.clone(),
                MarkovNode::new(address, node_record.description.clone(), node_record.mint),
            );
        }

        let mut edges = BTreeMap::new();
        for edge_record in record.payload.edges.values() {
            let edge = MarkovEdge::new(
                EdgeAddress::from_raw(&edge_record.address),
                edge_record.reversed,
                NodeAddress::from_raw(&edge_record.src),
                NodeAddress::from_raw(&edge_record.dst),
                edge_record.transition_probability,
            );
            edges.insert(edge.key(), edge);
        }

        let scoring_addresses: BTreeSet<NodeAddress> = record
            .payload
            .scoring_addresses
            .iter()
            .map(|raw| NodeAddress::from_raw(raw))
            .collect();

        Self::from_components(nodes, edges, scoring_addresses)
    }

    /// Serialize to a JSON string.
    pub fn to_json_string(&self) -> Result<String, CredGraphError> {
        serde_json::to_string(&self.to_record()).map_err(|err| {
            CredGraphError::Invariant(format!("record serialization failed: {}", err))
        })
    }

    /// Deserialize from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, CredGraphError> {
        let record: MarkovProcessGraphRecord = serde_json::from_str(json).map_err(|err| {
            CredGraphError::Configuration(format!("malformed record JSON: {}", err))
        })?;
        Self::from_record(&record)
    }

    /// Canonical content fingerprint of the graph, for provenance
    /// tracking and determinism checks.
    ///
    /// Folds the portable payload in sorted key order, with floats
    /// quantized; identical graphs digest identically on every
    /// platform.
    pub fn fingerprint(&self) -> String {
        let payload = self.to_record().payload;
        let mut digest = CanonicalDigest::new();
        for (key, node) in &payload.nodes {
            digest.write_str(key);
            digest.write_str(&node.description);
            digest.write_f64(node.mint);
        }
        for (key, edge) in &payload.edges {
            digest.write_str(key);
            digest.write_bool(edge.reversed);
            digest.write_str(&edge.src);
            digest.write_str(&edge.dst);
            digest.write_f64(edge.transition_probability);
        }
        for address in &payload.scoring_addresses {
            digest.write_str(address);
        }
        digest.finish_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fibration::{FibrationOptions, SeedOptions};
    use crate::types::{GraphEdge, GraphNode, WeightedGraph};
    use crate::weights::WeightRules;

    fn addr(name: &str) -> NodeAddress {
        NodeAddress::new(["test", name]).unwrap()
    }

    fn build_mpg() -> MarkovProcessGraph {
        let rules = WeightRules::new().with_node_rule(addr("a"), 1.0);
        let mut graph = WeightedGraph::with_weights(rules);
        graph.add_node(GraphNode::new(addr("a"), "a".to_string()));
        graph.add_node(GraphNode::new(addr("b"), "b".to_string()));
        graph.add_edge(GraphEdge::new(
            EdgeAddress::new(["test", "edge", "ab"]).unwrap(),
            addr("a"),
            addr("b"),
            0,
        ));
        let fibration = FibrationOptions {
            scoring_prefixes: vec![addr("a")],
            beta: 0.1,
            gamma_forward: 0.05,
            gamma_backward: 0.05,
        };
        MarkovProcessGraph::new(&graph, &fibration, &SeedOptions { alpha: 0.1 }).unwrap()
    }

    #[test]
    fn test_record_is_self_describing() {
        let record = build_mpg().to_record();
        assert_eq!(record.record_type, MARKOV_PROCESS_GRAPH_JSON_TYPE);
        assert_eq!(record.version, MARKOV_PROCESS_GRAPH_VERSION);
        assert!(!record.payload.nodes.is_empty());
        assert!(!record.payload.edges.is_empty());
        assert_eq!(record.payload.scoring_addresses.len(), 1);
    }

    #[test]
    fn test_json_field_names() {
        let json = build_mpg().to_json_string().unwrap();
        assert!(json.contains("\"type\":\"sourcecred/markovProcessGraph\""));
        assert!(json.contains("\"scoringAddresses\""));
        assert!(json.contains("\"transitionProbability\""));
    }

    #[test]
    fn test_round_trip_equality() {
        let mpg = build_mpg();
        let restored = MarkovProcessGraph::from_json_str(&mpg.to_json_string().unwrap()).unwrap();
        assert_eq!(mpg, restored);
        assert_eq!(mpg.fingerprint(), restored.fingerprint());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut record = build_mpg().to_record();
        record.record_type = "sourcecred/somethingElse".to_string();
        let err = MarkovProcessGraph::from_record(&record).unwrap_err();
        assert!(matches!(err, CredGraphError::Configuration(_)));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut record = build_mpg().to_record();
        record.version = "9.9.9".to_string();
        let err = MarkovProcessGraph::from_record(&record).unwrap_err();
        assert!(matches!(err, CredGraphError::Configuration(_)));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mpg = build_mpg();
        let rules = WeightRules::new().with_node_rule(addr("a"), 2.0);
        let mut graph = WeightedGraph::with_weights(rules);
        graph.add_node(GraphNode::new(addr("a"), "a".to_string()));
        let other = MarkovProcessGraph::new(
            &graph,
            &FibrationOptions {
                scoring_prefixes: vec![],
                beta: 0.0,
                gamma_forward: 0.0,
                gamma_backward: 0.0,
            },
            &SeedOptions { alpha: 0.0 },
        )
        .unwrap();
        assert_ne!(mpg.fingerprint(), other.fingerprint());
    }
}
