//! Weighted contribution graph consumed by the builder.
//!
//! This is the input side of the kernel: plain nodes and timestamped
//! bidirectional edges plus the weight rules the evaluators consume.
//! Uses `BTreeMap` collections for deterministic iteration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::address::{EdgeAddress, NodeAddress};
use crate::weights::WeightRules;

/// A node of the input contribution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Address of the node.
    pub address: NodeAddress,
    /// Human-readable description.
    pub description: String,
}

impl GraphNode {
    /// Create a new input node.
    pub fn new(address: NodeAddress, description: String) -> Self {
        Self {
            address,
            description,
        }
    }
}

/// A bidirectional edge of the input contribution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Address of the edge.
    pub address: EdgeAddress,
    /// Source node address.
    pub src: NodeAddress,
    /// Destination node address.
    pub dst: NodeAddress,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl GraphEdge {
    /// Create a new input edge.
    pub fn new(
        address: EdgeAddress,
        src: NodeAddress,
        dst: NodeAddress,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            address,
            src,
            dst,
            timestamp_ms,
        }
    }
}

/// Weighted contribution graph: nodes, edges, and weight rules.
///
/// An edge is **dangling** when either endpoint is absent from the
/// node set; dangling edges are retained here but excluded from
/// construction via [`WeightedGraph::non_dangling_edges`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightedGraph {
    /// Nodes by address.
    nodes: BTreeMap<NodeAddress, GraphNode>,
    /// All edges, in insertion order.
    edges: Vec<GraphEdge>,
    /// Weight rules consumed by the evaluators.
    weights: WeightRules,
}

impl WeightedGraph {
    /// Create an empty graph with default weight rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with the given weight rules.
    pub fn with_weights(weights: WeightRules) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            weights,
        }
    }

    /// Add a node. A later node with the same address replaces the
    /// earlier one.
    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.insert(node.address.clone(), node);
    }

    /// Add an edge.
    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.edges.push(edge);
    }

    /// Look up a node by address.
    pub fn node(&self, address: &NodeAddress) -> Option<&GraphNode> {
        self.nodes.get(address)
    }

    /// Whether a node with this address exists.
    pub fn contains_node(&self, address: &NodeAddress) -> bool {
        self.nodes.contains_key(address)
    }

    /// Iterate nodes in address order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Iterate all edges, dangling included, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    /// Iterate edges whose endpoints both exist in the node set.
    pub fn non_dangling_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(|edge| {
            self.nodes.contains_key(&edge.src) && self.nodes.contains_key(&edge.dst)
        })
    }

    /// The weight rules.
    pub fn weights(&self) -> &WeightRules {
        &self.weights
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges, dangling included.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
