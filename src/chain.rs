//! Sparse chain emission for the power-iteration solver.
//!
//! The emitter flattens the graph into an indexed, column-stochastic
//! sparse form: node addresses in canonical order, and for each
//! destination two equal-length parallel arrays of source indices and
//! transition weights. Parallel incoming edges keep their repeated
//! source indices; downstream code must tolerate repeats.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CredGraphError;
use crate::markov::MarkovProcessGraph;
use crate::types::NodeAddress;
use crate::STOCHASTICITY_TOLERANCE;

/// Incoming transitions of one destination node, as parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInTransitions {
    /// Index of each source node in the chain's node order.
    pub src_indices: Vec<usize>,
    /// Transition probability of each incoming edge, aligned with
    /// `src_indices`.
    pub weights: Vec<f64>,
}

/// An indexed sparse column-stochastic transition matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMarkovChain {
    /// Node addresses in canonical order; positions are the indices
    /// used by [`NodeInTransitions`].
    pub node_order: Vec<NodeAddress>,
    /// Incoming transitions per node, aligned with `node_order`.
    pub in_transitions: Vec<NodeInTransitions>,
}

impl MarkovProcessGraph {
    /// Emit the graph as a sparse Markov chain.
    ///
    /// Before emitting, re-verifies that every node's out-transition
    /// mass is within tolerance of one; an edge endpoint with no
    /// corresponding node is a lookup error.
    pub fn to_markov_chain(&self) -> Result<SparseMarkovChain, CredGraphError> {
        let mut out_mass: BTreeMap<&NodeAddress, f64> = BTreeMap::new();
        for edge in self.edges() {
            *out_mass.entry(&edge.src).or_insert(0.0) += edge.transition_probability;
        }
        for node in self.nodes() {
            let mass = out_mass.get(&node.address).copied().unwrap_or(0.0);
            if (mass - 1.0).abs() > STOCHASTICITY_TOLERANCE {
                return Err(CredGraphError::Invariant(format!(
                    "out-transition mass for {} is {}, not 1",
                    node.address, mass
                )));
            }
        }

        let node_order: Vec<NodeAddress> =
            self.nodes().map(|node| node.address.clone()).collect();
        let index: BTreeMap<&NodeAddress, usize> = node_order
            .iter()
            .enumerate()
            .map(|(i, address)| (address, i))
            .collect();

        let mut in_transitions = vec![NodeInTransitions::default(); node_order.len()];
        for edge in self.edges() {
            let src = *index.get(&edge.src).ok_or_else(|| {
                CredGraphError::Lookup(format!("edge {} has unknown source {}", edge.key(), edge.src))
            })?;
            let dst = *index.get(&edge.dst).ok_or_else(|| {
                CredGraphError::Lookup(format!(
                    "edge {} has unknown destination {}",
                    edge.key(),
                    edge.dst
                ))
            })?;
            in_transitions[dst].src_indices.push(src);
            in_transitions[dst].weights.push(edge.transition_probability);
        }

        debug!(
            nodes = node_order.len(),
            entries = in_transitions.iter().map(|t| t.weights.len()).sum::<usize>(),
            "emitted sparse markov chain"
        );

        Ok(SparseMarkovChain {
            node_order,
            in_transitions,
        })
    }
}

impl SparseMarkovChain {
    /// Number of nodes in the chain.
    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    /// The incoming transitions of the node at `index`.
    pub fn in_transitions_of(&self, index: usize) -> &NodeInTransitions {
        &self.in_transitions[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fibration::{FibrationOptions, SeedOptions};
    use crate::types::{EdgeAddress, GraphEdge, GraphNode, WeightedGraph};
    use crate::weights::WeightRules;

    fn addr(name: &str) -> NodeAddress {
        NodeAddress::new(["test", name]).unwrap()
    }

    fn no_fibration() -> FibrationOptions {
        FibrationOptions {
            scoring_prefixes: vec![],
            beta: 0.0,
            gamma_forward: 0.0,
            gamma_backward: 0.0,
        }
    }

    fn simple_mpg() -> MarkovProcessGraph {
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
        MarkovProcessGraph::new(&graph, &no_fibration(), &SeedOptions { alpha: 0.1 }).unwrap()
    }

    #[test]
    fn test_node_order_is_sorted() {
        let chain = simple_mpg().to_markov_chain().unwrap();
        let mut sorted = chain.node_order.clone();
        sorted.sort();
        assert_eq!(chain.node_order, sorted);
    }

    #[test]
    fn test_columns_sum_to_one_via_rows() {
        let chain = simple_mpg().to_markov_chain().unwrap();
        // Reassemble out-mass per source from the in-lists.
        let mut out = vec![0.0; chain.node_count()];
        for transitions in &chain.in_transitions {
            for (src, weight) in transitions.src_indices.iter().zip(&transitions.weights) {
                out[*src] += weight;
            }
        }
        for mass in out {
            assert!((mass - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_arrays_are_parallel() {
        let chain = simple_mpg().to_markov_chain().unwrap();
        for transitions in &chain.in_transitions {
            assert_eq!(transitions.src_indices.len(), transitions.weights.len());
        }
    }
}
