//! Weight evaluators over prefix-matched rule tables.
//!
//! The rule language itself is external to the kernel; what the
//! builder consumes are two pure functions derived from
//! [`WeightRules`]: a node evaluator producing the mint weight and an
//! edge evaluator producing the `(forward, backward)` pair.
//!
//! A rule applies when its prefix matches the address. When several
//! rules match, their weights compose multiplicatively; when none
//! match, the configured default applies. The node default is `0.0`
//! (unmatched nodes mint nothing) and the edge default is `(1.0,
//! 1.0)`.

use serde::{Deserialize, Serialize};

use crate::types::{EdgeAddress, NodeAddress};

/// A prefix-matched node weight rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeWeightRule {
    /// Prefix the rule applies to.
    pub prefix: NodeAddress,
    /// Weight factor contributed by this rule.
    pub weight: f64,
}

/// A prefix-matched edge weight rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeightRule {
    /// Prefix the rule applies to.
    pub prefix: EdgeAddress,
    /// Forward weight factor.
    pub forward: f64,
    /// Backward weight factor.
    pub backward: f64,
}

/// Per-direction weight pair produced by the edge evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    /// Weight of the src → dst half.
    pub forward: f64,
    /// Weight of the dst → src half.
    pub backward: f64,
}

/// Weight rules for a contribution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRules {
    node_rules: Vec<NodeWeightRule>,
    edge_rules: Vec<EdgeWeightRule>,
    default_node_weight: f64,
    default_edge_weight: EdgeWeight,
}

impl Default for WeightRules {
    fn default() -> Self {
        Self {
            node_rules: Vec::new(),
            edge_rules: Vec::new(),
            default_node_weight: 0.0,
            default_edge_weight: EdgeWeight {
                forward: 1.0,
                backward: 1.0,
            },
        }
    }
}

impl WeightRules {
    /// Create an empty rule set with the standard defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node rule, builder-style.
    pub fn with_node_rule(mut self, prefix: NodeAddress, weight: f64) -> Self {
        self.node_rules.push(NodeWeightRule { prefix, weight });
        self
    }

    /// Add an edge rule, builder-style.
    pub fn with_edge_rule(mut self, prefix: EdgeAddress, forward: f64, backward: f64) -> Self {
        self.edge_rules.push(EdgeWeightRule {
            prefix,
            forward,
            backward,
        });
        self
    }

    /// Override the default node weight.
    pub fn with_default_node_weight(mut self, weight: f64) -> Self {
        self.default_node_weight = weight;
        self
    }

    /// Override the default edge weight pair.
    pub fn with_default_edge_weight(mut self, forward: f64, backward: f64) -> Self {
        self.default_edge_weight = EdgeWeight { forward, backward };
        self
    }

    /// Node weight evaluator: the mint weight for `address`.
    ///
    /// Finiteness and non-negativity are enforced by the builder,
    /// which rejects the graph on violation.
    pub fn node_weight(&self, address: &NodeAddress) -> f64 {
        let mut weight = None;
        for rule in &self.node_rules {
            if address.has_prefix(&rule.prefix) {
                weight = Some(weight.unwrap_or(1.0) * rule.weight);
            }
        }
        weight.unwrap_or(self.default_node_weight)
    }

    /// Edge weight evaluator: the `(forward, backward)` pair for
    /// `address`. A zero on either side suppresses that direction.
    pub fn edge_weight(&self, address: &EdgeAddress) -> EdgeWeight {
        let mut weight: Option<EdgeWeight> = None;
        for rule in &self.edge_rules {
            if address.has_prefix(&rule.prefix) {
                let current = weight.unwrap_or(EdgeWeight {
                    forward: 1.0,
                    backward: 1.0,
                });
                weight = Some(EdgeWeight {
                    forward: current.forward * rule.forward,
                    backward: current.backward * rule.backward,
                });
            }
        }
        weight.unwrap_or(self.default_edge_weight)
    }
}
