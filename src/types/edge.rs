//! Edge types for the Markov process graph.

use serde::{Deserialize, Serialize};

use super::address::{Direction, EdgeAddress, MarkovEdgeAddress, NodeAddress};

/// A directed edge of the Markov process graph carrying a transition
/// probability.
///
/// The primary key is `(address, reversed)`: the two halves of a
/// bidirectional input edge share the underlying address and differ
/// only in the `reversed` flag. Parallel input edges keep their
/// distinct addresses and are never collapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovEdge {
    /// Underlying edge address.
    pub address: EdgeAddress,
    /// Whether this edge is the backward half of its input edge.
    /// Always `false` for synthesized (minting, payout, radiation)
    /// edges and the forward half of webbing.
    pub reversed: bool,
    /// Source node address (post-fibration).
    pub src: NodeAddress,
    /// Destination node address (post-fibration).
    pub dst: NodeAddress,
    /// Transition probability in `[0, 1]`.
    pub transition_probability: f64,
}

impl MarkovEdge {
    /// Create a new edge.
    pub fn new(
        address: EdgeAddress,
        reversed: bool,
        src: NodeAddress,
        dst: NodeAddress,
        transition_probability: f64,
    ) -> Self {
        Self {
            address,
            reversed,
            src,
            dst,
            transition_probability,
        }
    }

    /// The edge's primary key.
    pub fn key(&self) -> MarkovEdgeAddress {
        MarkovEdgeAddress::new(Direction::from_reversed(self.reversed), self.address.clone())
    }
}
