//! Node types for the Markov process graph.

use serde::{Deserialize, Serialize};

use super::address::NodeAddress;

/// A node of the Markov process graph.
///
/// One of three classes, distinguishable by address: the unique seed
/// node, a base node carried over from the input graph, or an epoch
/// node synthesized by the fibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovNode {
    /// Address of the node.
    pub address: NodeAddress,
    /// Human-readable description, carried through for diagnostics.
    pub description: String,
    /// Non-negative share of seed outflow minted to this node.
    /// Zero for the seed itself and for epoch nodes.
    pub mint: f64,
}

impl MarkovNode {
    /// Create a new node.
    pub fn new(address: NodeAddress, description: String, mint: f64) -> Self {
        Self {
            address,
            description,
            mint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_fields() {
        let address = NodeAddress::new(["plugin", "repo", "pull", "7"]).unwrap();
        let node = MarkovNode::new(address.clone(), "pull #7".to_string(), 2.5);
        assert_eq!(node.address, address);
        assert_eq!(node.description, "pull #7");
        assert_eq!(node.mint, 2.5);
    }
}
