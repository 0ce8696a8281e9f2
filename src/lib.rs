//! # cred-markov-kernel
//!
//! Markov process graph construction for cred scoring.
//!
//! The kernel answers one question:
//!
//! > Given a weighted, bidirectional contribution graph, what is the
//! > stochastic, unidirectional transition graph a power-iteration
//! > solver should run on?
//!
//! ## Core Contract
//!
//! 1. Synthesize seed, base, and epoch nodes plus minting, base,
//!    payout, webbing, and radiation edges into one coherent graph
//! 2. Preserve exact probability mass: every node's out-transitions
//!    sum to one within tolerance
//! 3. Fibrate scoring nodes across week-aligned epochs, routing every
//!    incident edge through the correct epoch incarnation
//!
//! ## Architecture
//!
//! ```text
//! WeightedGraph ─┬─> FibrationPlan ──> MarkovProcessGraph ──> SparseMarkovChain
//!                │   (scoring set,       (builder +              (solver input)
//!                │    week epochs)        query surface)
//!                └─> WeightRules
//!                    (mint / forward / backward evaluators)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same graph + same options → identical node set, edge set, and
//!   fingerprint
//! - Node and edge iteration is canonical (by address order)
//! - Week boundaries are fixed to Monday 00:00 UTC; no ambient state
//!   enters the construction

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod weights;
pub mod epochs;
pub mod fibration;
pub mod markov;
pub mod chain;
pub mod portable;
pub mod canonical;
pub mod error;

// Re-exports
pub use types::{
    NodeAddress, EdgeAddress, Direction, MarkovEdgeAddress,
    core_node_prefix, seed_address, epoch_node_prefix,
    epoch_payout_prefix, epoch_webbing_prefix, epoch_radiation_prefix,
    contribution_radiation_prefix, seed_mint_prefix,
};
pub use types::{MarkovNode, MarkovEdge};
pub use types::{GraphNode, GraphEdge, WeightedGraph};
pub use weights::{WeightRules, NodeWeightRule, EdgeWeightRule, EdgeWeight};
pub use epochs::{IntervalBoundary, EpochPartition, week_boundaries};
pub use fibration::{
    epoch_node_address, payout_edge_address, webbing_edge_address, FibrationOptions,
    FibrationPlan, SeedOptions,
};
pub use markov::{
    contribution_radiation_address, epoch_radiation_address, seed_mint_address,
    MarkovProcessGraph,
};
pub use chain::{SparseMarkovChain, NodeInTransitions};
pub use portable::{MarkovProcessGraphRecord, MarkovProcessGraphPayload};
pub use canonical::{quantize, CanonicalDigest};
pub use error::CredGraphError;

/// Type tag embedded in the portable record form.
pub const MARKOV_PROCESS_GRAPH_JSON_TYPE: &str = "sourcecred/markovProcessGraph";

/// Semantic version of the portable record form.
/// Increment on breaking changes to the payload shape.
pub const MARKOV_PROCESS_GRAPH_VERSION: &str = "0.1.0";

/// Tolerance for the out-transition stochasticity check.
///
/// Every node's outgoing transition probabilities must sum to one
/// within this tolerance, both after construction and before chain
/// emission.
pub const STOCHASTICITY_TOLERANCE: f64 = 1e-3;
