//! The Markov process graph: builder and query surface.
//!
//! Construction is a single pure pass from `(weighted graph,
//! fibration options, seed options)` to an immutable value, in a
//! fixed order:
//!
//! 1. Plan the fibration (scoring set, week epochs)
//! 2. Emit the seed node
//! 3. Emit one base node per input node, minting its weight
//! 4. Emit epoch nodes with payout and webbing edges
//! 5. Emit minting edges from the seed, normalized by total mint
//! 6. Emit base edges, grouped by rewritten source and normalized
//!    within each group
//! 7. Close every non-seed node's residual mass with a radiation
//!    edge back to the seed
//!
//! Radiation is the closure step: its probability is computed from
//! the already-emitted edges, so it must come last. When a node emits
//! no base edges — an epoch node whose owner was inactive that week,
//! or a base node with no outgoing weight — the entire unallocated
//! remainder becomes radiation.
//!
//! ## Determinism Guarantees
//!
//! - All collections are `BTreeMap`/`BTreeSet`; iteration is by
//!   address order
//! - The end state is independent of input edge order apart from the
//!   canonical orders above

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::epochs::IntervalBoundary;
use crate::error::CredGraphError;
use crate::fibration::{
    epoch_node_address, payout_edge_address, validate_parameters, webbing_edge_address,
    FibrationOptions, FibrationPlan, SeedOptions,
};
use crate::types::{
    contribution_radiation_prefix, core_node_prefix, epoch_node_prefix, epoch_radiation_prefix,
    seed_address, seed_mint_prefix, EdgeAddress, MarkovEdge, MarkovEdgeAddress, MarkovNode,
    NodeAddress, WeightedGraph,
};
use crate::STOCHASTICITY_TOLERANCE;

/// Largest negative residue the radiation pass will absorb as
/// rounding noise from the normalization pass.
const RESIDUAL_GUARD: f64 = 1e-12;

/// Address of the radiation edge leaving an epoch node.
pub fn epoch_radiation_address(node: &NodeAddress) -> EdgeAddress {
    let mut parts: Vec<String> = epoch_radiation_prefix().parts().to_vec();
    parts.extend(node.parts().iter().cloned());
    EdgeAddress::new_unchecked(parts)
}

/// Address of the radiation edge leaving a contribution (base) node.
pub fn contribution_radiation_address(node: &NodeAddress) -> EdgeAddress {
    let mut parts: Vec<String> = contribution_radiation_prefix().parts().to_vec();
    parts.extend(node.parts().iter().cloned());
    EdgeAddress::new_unchecked(parts)
}

/// Address of the minting edge from the seed to `target`.
pub fn seed_mint_address(target: &NodeAddress) -> EdgeAddress {
    let mut parts: Vec<String> = seed_mint_prefix().parts().to_vec();
    parts.extend(target.parts().iter().cloned());
    EdgeAddress::new_unchecked(parts)
}

/// One unidirectional half of an input edge, after endpoint rewrite,
/// awaiting normalization within its source group.
struct BaseCandidate {
    address: EdgeAddress,
    reversed: bool,
    dst: NodeAddress,
    weight: f64,
}

fn insert_node(
    nodes: &mut BTreeMap<NodeAddress, MarkovNode>,
    node: MarkovNode,
) -> Result<(), CredGraphError> {
    let address = node.address.clone();
    if nodes.insert(address.clone(), node).is_some() {
        return Err(CredGraphError::Invariant(format!(
            "duplicate node address: {}",
            address
        )));
    }
    Ok(())
}

fn insert_edge(
    edges: &mut BTreeMap<MarkovEdgeAddress, MarkovEdge>,
    out_mass: &mut BTreeMap<NodeAddress, f64>,
    edge: MarkovEdge,
) -> Result<(), CredGraphError> {
    let p = edge.transition_probability;
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(CredGraphError::Invariant(format!(
            "transition probability for {} is {}, outside [0, 1]",
            edge.key(),
            p
        )));
    }
    *out_mass.entry(edge.src.clone()).or_insert(0.0) += p;
    let key = edge.key();
    if edges.insert(key.clone(), edge).is_some() {
        return Err(CredGraphError::Invariant(format!(
            "duplicate edge address: {}",
            key
        )));
    }
    Ok(())
}

fn index_in_edges(
    edges: &BTreeMap<MarkovEdgeAddress, MarkovEdge>,
) -> BTreeMap<NodeAddress, Vec<MarkovEdgeAddress>> {
    let mut index: BTreeMap<NodeAddress, Vec<MarkovEdgeAddress>> = BTreeMap::new();
    for (key, edge) in edges {
        index.entry(edge.dst.clone()).or_default().push(key.clone());
    }
    index
}

fn epoch_starts_from_nodes(
    nodes: &BTreeMap<NodeAddress, MarkovNode>,
) -> Result<Vec<IntervalBoundary>, CredGraphError> {
    let prefix = epoch_node_prefix();
    let boundary_index = prefix.parts().len();
    let mut starts = BTreeSet::new();
    for address in nodes.keys() {
        if address.has_prefix(&prefix) {
            starts.insert(address.parts()[boundary_index].parse::<IntervalBoundary>()?);
        }
    }
    Ok(starts.into_iter().collect())
}

/// An immutable, stochastic, unidirectional transition graph over
/// contribution nodes, epoch nodes, and the seed.
///
/// Constructed once via [`MarkovProcessGraph::new`]; every query is
/// read-only and deterministic.
#[derive(Debug, Clone)]
pub struct MarkovProcessGraph {
    nodes: BTreeMap<NodeAddress, MarkovNode>,
    edges: BTreeMap<MarkovEdgeAddress, MarkovEdge>,
    scoring_addresses: BTreeSet<NodeAddress>,
    epoch_starts: Vec<IntervalBoundary>,
    in_index: BTreeMap<NodeAddress, Vec<MarkovEdgeAddress>>,
}

impl MarkovProcessGraph {
    /// Construct the Markov process graph for `graph` under the given
    /// fibration and seed options.
    ///
    /// Fails with the error taxonomy of [`CredGraphError`]: bad
    /// teleportation parameters, reserved-prefix or bad-weight input
    /// nodes, duplicate addresses, out-of-range probabilities, zero
    /// total mint, or an out-transition mass outside tolerance.
    pub fn new(
        graph: &WeightedGraph,
        fibration: &FibrationOptions,
        seed: &SeedOptions,
    ) -> Result<Self, CredGraphError> {
        let remainders = validate_parameters(fibration, seed)?;
        let plan = FibrationPlan::new(graph, fibration)?;
        let seed_addr = seed_address();
        let core = core_node_prefix();
        let epoch_prefix = epoch_node_prefix();

        let mut nodes: BTreeMap<NodeAddress, MarkovNode> = BTreeMap::new();
        let mut edges: BTreeMap<MarkovEdgeAddress, MarkovEdge> = BTreeMap::new();
        let mut out_mass: BTreeMap<NodeAddress, f64> = BTreeMap::new();

        insert_node(
            &mut nodes,
            MarkovNode::new(seed_addr.clone(), "seed".to_string(), 0.0),
        )?;

        for gnode in graph.nodes() {
            if gnode.address.has_prefix(&core) {
                return Err(CredGraphError::Input(format!(
                    "input node address is under the reserved core prefix: {}",
                    gnode.address
                )));
            }
            let mint = graph.weights().node_weight(&gnode.address);
            if !mint.is_finite() || mint < 0.0 {
                return Err(CredGraphError::Input(format!(
                    "node weight for {} must be a non-negative finite number, got {}",
                    gnode.address, mint
                )));
            }
            insert_node(
                &mut nodes,
                MarkovNode::new(gnode.address.clone(), gnode.description.clone(), mint),
            )?;
        }

        for owner in plan.scoring() {
            let mut previous: Option<IntervalBoundary> = None;
            for &start in plan.partition().starts() {
                let epoch = epoch_node_address(owner, start);
                insert_node(
                    &mut nodes,
                    MarkovNode::new(
                        epoch.clone(),
                        format!("epoch {} of {}", start, owner),
                        0.0,
                    ),
                )?;
                insert_edge(
                    &mut edges,
                    &mut out_mass,
                    MarkovEdge::new(
                        payout_edge_address(owner, start),
                        false,
                        epoch.clone(),
                        owner.clone(),
                        fibration.beta,
                    ),
                )?;
                if let Some(prev_start) = previous {
                    let prev = epoch_node_address(owner, prev_start);
                    let webbing = webbing_edge_address(owner, start);
                    insert_edge(
                        &mut edges,
                        &mut out_mass,
                        MarkovEdge::new(
                            webbing.clone(),
                            false,
                            prev.clone(),
                            epoch.clone(),
                            fibration.gamma_forward,
                        ),
                    )?;
                    insert_edge(
                        &mut edges,
                        &mut out_mass,
                        MarkovEdge::new(webbing, true, epoch.clone(), prev, fibration.gamma_backward),
                    )?;
                }
                previous = Some(start);
            }
        }

        let total_mint: f64 = nodes.values().map(|n| n.mint).sum();
        if total_mint <= 0.0 {
            return Err(CredGraphError::Invariant(
                "zero total mint: no outflow from the seed".to_string(),
            ));
        }
        let mint_targets: Vec<(NodeAddress, f64)> = nodes
            .values()
            .filter(|n| n.mint > 0.0)
            .map(|n| (n.address.clone(), n.mint))
            .collect();
        for (address, mint) in mint_targets {
            insert_edge(
                &mut edges,
                &mut out_mass,
                MarkovEdge::new(
                    seed_mint_address(&address),
                    false,
                    seed_addr.clone(),
                    address,
                    mint / total_mint,
                ),
            )?;
        }

        // Two passes per source group: the divisor Σw must be known
        // before any edge in the group is emitted.
        let mut grouped: BTreeMap<NodeAddress, Vec<BaseCandidate>> = BTreeMap::new();
        for gedge in graph.non_dangling_edges() {
            let weight = graph.weights().edge_weight(&gedge.address);
            let halves = [
                (weight.forward, false, &gedge.src, &gedge.dst),
                (weight.backward, true, &gedge.dst, &gedge.src),
            ];
            for (half_weight, reversed, from, to) in halves {
                if !half_weight.is_finite() || half_weight < 0.0 {
                    return Err(CredGraphError::Input(format!(
                        "edge weight for {} must be a non-negative finite number, got {}",
                        gedge.address, half_weight
                    )));
                }
                if half_weight == 0.0 {
                    continue;
                }
                let src = plan.rewrite(from, gedge.timestamp_ms);
                let dst = plan.rewrite(to, gedge.timestamp_ms);
                grouped.entry(src).or_default().push(BaseCandidate {
                    address: gedge.address.clone(),
                    reversed,
                    dst,
                    weight: half_weight,
                });
            }
        }
        for (src, candidates) in grouped {
            let total_weight: f64 = candidates.iter().map(|c| c.weight).sum();
            let remainder = if src.has_prefix(&epoch_prefix) {
                remainders.epoch
            } else {
                remainders.base
            };
            trace!(
                source = %src,
                candidates = candidates.len(),
                total_weight,
                remainder,
                "normalizing base edges"
            );
            for candidate in candidates {
                insert_edge(
                    &mut edges,
                    &mut out_mass,
                    MarkovEdge::new(
                        candidate.address,
                        candidate.reversed,
                        src.clone(),
                        candidate.dst,
                        candidate.weight / total_weight * remainder,
                    ),
                )?;
            }
        }

        // Radiation closes each non-seed node's mass back to the
        // seed, absorbing every unallocated share.
        let radiation_sources: Vec<NodeAddress> = nodes
            .keys()
            .filter(|address| **address != seed_addr)
            .cloned()
            .collect();
        for address in radiation_sources {
            let allocated = out_mass.get(&address).copied().unwrap_or(0.0);
            let mut residual = 1.0 - allocated;
            // Normalization can leave a sub-guard negative residue.
            if residual < 0.0 && residual > -RESIDUAL_GUARD {
                residual = 0.0;
            }
            let radiation_address = if address.has_prefix(&epoch_prefix) {
                epoch_radiation_address(&address)
            } else {
                contribution_radiation_address(&address)
            };
            insert_edge(
                &mut edges,
                &mut out_mass,
                MarkovEdge::new(
                    radiation_address,
                    false,
                    address,
                    seed_addr.clone(),
                    residual,
                ),
            )?;
        }

        for address in nodes.keys() {
            let mass = out_mass.get(address).copied().unwrap_or(0.0);
            if (mass - 1.0).abs() > STOCHASTICITY_TOLERANCE {
                return Err(CredGraphError::Invariant(format!(
                    "out-transition mass for {} is {}, not 1",
                    address, mass
                )));
            }
        }

        let epoch_starts = epoch_starts_from_nodes(&nodes)?;
        let in_index = index_in_edges(&edges);

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            scoring = plan.scoring().len(),
            epochs = epoch_starts.len(),
            "constructed markov process graph"
        );

        Ok(Self {
            nodes,
            edges,
            scoring_addresses: plan.scoring().clone(),
            epoch_starts,
            in_index,
        })
    }

    /// Reassemble a graph from deserialized components, rebuilding
    /// the derived indices.
    pub(crate) fn from_components(
        nodes: BTreeMap<NodeAddress, MarkovNode>,
        edges: BTreeMap<MarkovEdgeAddress, MarkovEdge>,
        scoring_addresses: BTreeSet<NodeAddress>,
    ) -> Result<Self, CredGraphError> {
        let epoch_starts = epoch_starts_from_nodes(&nodes)?;
        let in_index = index_in_edges(&edges);
        Ok(Self {
            nodes,
            edges,
            scoring_addresses,
            epoch_starts,
            in_index,
        })
    }

    /// Look up a node by address.
    pub fn node(&self, address: &NodeAddress) -> Option<&MarkovNode> {
        self.nodes.get(address)
    }

    /// Iterate all nodes in canonical address order.
    pub fn nodes(&self) -> impl Iterator<Item = &MarkovNode> {
        self.nodes.values()
    }

    /// Iterate nodes whose address has the given prefix, in canonical
    /// order.
    pub fn nodes_with_prefix<'a>(
        &'a self,
        prefix: &'a NodeAddress,
    ) -> impl Iterator<Item = &'a MarkovNode> + 'a {
        self.nodes
            .values()
            .filter(move |node| node.address.has_prefix(prefix))
    }

    /// Look up an edge by primary key.
    pub fn edge(&self, key: &MarkovEdgeAddress) -> Option<&MarkovEdge> {
        self.edges.get(key)
    }

    /// Iterate all edges in canonical key order.
    pub fn edges(&self) -> impl Iterator<Item = &MarkovEdge> {
        self.edges.values()
    }

    /// Iterate the incoming edges of a node, in canonical key order.
    pub fn in_edges<'a>(
        &'a self,
        address: &NodeAddress,
    ) -> impl Iterator<Item = &'a MarkovEdge> + 'a {
        self.in_index
            .get(address)
            .into_iter()
            .flatten()
            .filter_map(move |key| self.edges.get(key))
    }

    /// The scoring addresses, in canonical order.
    pub fn scoring_addresses(&self) -> &BTreeSet<NodeAddress> {
        &self.scoring_addresses
    }

    /// The epoch starts present in the graph, ascending. Empty when
    /// nothing is scoring.
    pub fn epoch_starts(&self) -> &[IntervalBoundary] {
        &self.epoch_starts
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// Equality is over the logical content: node set, edge set, and
// scoring set. The derived indices are functions of these.
impl PartialEq for MarkovProcessGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.edges == other.edges
            && self.scoring_addresses == other.scoring_addresses
    }
}
