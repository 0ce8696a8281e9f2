//! Fibration planning: scoring addresses, epoch nodes, and the
//! temporal webbing between them.
//!
//! The fibration splits every scoring node into one copy per epoch
//! and rewrites incident edges to land on the copy matching the
//! edge's timestamp. This module owns the plan — which addresses are
//! scoring, which epochs exist, and how endpoints are rewritten — and
//! the address construction for the synthesized epoch structure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalDigest;
use crate::epochs::{week_boundaries, EpochPartition, IntervalBoundary};
use crate::error::CredGraphError;
use crate::types::{
    epoch_node_prefix, epoch_payout_prefix, epoch_webbing_prefix, EdgeAddress, NodeAddress,
    WeightedGraph,
};

/// Fibration parameters.
///
/// `beta` is the payout share from an epoch node to its owner;
/// `gamma_forward` and `gamma_backward` are the webbing shares to the
/// adjacent epochs. All are probabilities and must be non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibrationOptions {
    /// Node address prefixes marking scoring nodes.
    pub scoring_prefixes: Vec<NodeAddress>,
    /// Epoch → owner payout share.
    pub beta: f64,
    /// Epoch → next-epoch webbing share.
    pub gamma_forward: f64,
    /// Epoch → previous-epoch webbing share.
    pub gamma_backward: f64,
}

/// Seed parameters. `alpha` is the share of every non-seed node's
/// outflow that radiates back to the seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedOptions {
    /// Seed radiation share.
    pub alpha: f64,
}

impl FibrationOptions {
    /// Hash of the full parameter set (fibration plus seed). Floats
    /// are folded quantized, so the hash is stable across platforms.
    pub fn params_hash(&self, seed: &SeedOptions) -> String {
        let mut digest = CanonicalDigest::new();
        for prefix in &self.scoring_prefixes {
            digest.write_str(&prefix.to_raw());
        }
        digest.write_f64(seed.alpha);
        digest.write_f64(self.beta);
        digest.write_f64(self.gamma_forward);
        digest.write_f64(self.gamma_backward);
        digest.finish_hex()
    }
}

/// Probability mass left for base edges, per source class.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransitionRemainders {
    /// `1 − (α + β + γ_f + γ_b)`: mass for base edges leaving an
    /// epoch node.
    pub epoch: f64,
    /// `1 − α`: mass for base edges leaving a non-epoch node.
    pub base: f64,
}

/// Validate the teleportation parameters and derive the remainders.
///
/// Fails when any parameter is negative or non-finite, or when the
/// parameters jointly exceed unit mass.
pub(crate) fn validate_parameters(
    fibration: &FibrationOptions,
    seed: &SeedOptions,
) -> Result<TransitionRemainders, CredGraphError> {
    let named = [
        ("alpha", seed.alpha),
        ("beta", fibration.beta),
        ("gamma_forward", fibration.gamma_forward),
        ("gamma_backward", fibration.gamma_backward),
    ];
    for (name, value) in named {
        if !value.is_finite() || value < 0.0 {
            return Err(CredGraphError::Configuration(format!(
                "teleportation parameter {} must be a non-negative finite number, got {}",
                name, value
            )));
        }
    }
    let total =
        seed.alpha + fibration.beta + fibration.gamma_forward + fibration.gamma_backward;
    if total > 1.0 {
        return Err(CredGraphError::Configuration(format!(
            "teleportation parameters sum to {}, exceeding unit mass",
            total
        )));
    }
    Ok(TransitionRemainders {
        epoch: 1.0 - total,
        base: 1.0 - seed.alpha,
    })
}

/// Address of the epoch node owned by `owner` for the epoch starting
/// at `start`.
pub fn epoch_node_address(owner: &NodeAddress, start: IntervalBoundary) -> NodeAddress {
    let mut parts: Vec<String> = epoch_node_prefix().parts().to_vec();
    parts.push(start.to_string());
    parts.extend(owner.parts().iter().cloned());
    NodeAddress::new_unchecked(parts)
}

/// Address of the payout edge from `owner`'s epoch at `start` back to
/// `owner`.
pub fn payout_edge_address(owner: &NodeAddress, start: IntervalBoundary) -> EdgeAddress {
    let mut parts: Vec<String> = epoch_payout_prefix().parts().to_vec();
    parts.push(start.to_string());
    parts.extend(owner.parts().iter().cloned());
    EdgeAddress::new_unchecked(parts)
}

/// Address of the webbing edge pair between `owner`'s epoch at
/// `start` and the preceding epoch. Both halves share this address
/// and differ in direction.
pub fn webbing_edge_address(owner: &NodeAddress, start: IntervalBoundary) -> EdgeAddress {
    let mut parts: Vec<String> = epoch_webbing_prefix().parts().to_vec();
    parts.push(start.to_string());
    parts.extend(owner.parts().iter().cloned());
    EdgeAddress::new_unchecked(parts)
}

/// The set of scoring addresses: input nodes matching any scoring
/// prefix.
pub fn scoring_addresses(
    graph: &WeightedGraph,
    prefixes: &[NodeAddress],
) -> BTreeSet<NodeAddress> {
    graph
        .nodes()
        .filter(|node| prefixes.iter().any(|p| node.address.has_prefix(p)))
        .map(|node| node.address.clone())
        .collect()
}

/// The fibration plan for one construction: the scoring set plus the
/// epoch partition over the graph's non-dangling edge timestamps.
#[derive(Debug, Clone)]
pub struct FibrationPlan {
    scoring: BTreeSet<NodeAddress>,
    partition: EpochPartition,
}

impl FibrationPlan {
    /// Plan the fibration for `graph` under `options`.
    pub fn new(graph: &WeightedGraph, options: &FibrationOptions) -> Result<Self, CredGraphError> {
        let scoring = scoring_addresses(graph, &options.scoring_prefixes);
        let boundaries = week_boundaries(graph.non_dangling_edges().map(|e| e.timestamp_ms))?;
        Ok(Self {
            scoring,
            partition: EpochPartition::from_boundaries(boundaries),
        })
    }

    /// The scoring addresses, in canonical order.
    pub fn scoring(&self) -> &BTreeSet<NodeAddress> {
        &self.scoring
    }

    /// The epoch partition.
    pub fn partition(&self) -> &EpochPartition {
        &self.partition
    }

    /// Rewrite an edge endpoint for an edge stamped `timestamp_ms`:
    /// scoring addresses land on their epoch incarnation, everything
    /// else stays put. Total and deterministic, so grouping by
    /// rewritten source is well-defined.
    pub fn rewrite(&self, address: &NodeAddress, timestamp_ms: i64) -> NodeAddress {
        if self.scoring.contains(address) {
            epoch_node_address(address, self.partition.epoch_start_for(timestamp_ms))
        } else {
            address.clone()
        }
    }
}
