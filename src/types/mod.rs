//! Core types for the kernel.

pub mod address;
pub mod node;
pub mod edge;
pub mod graph;

pub use address::{
    contribution_radiation_prefix, core_node_prefix, epoch_node_prefix, epoch_payout_prefix,
    epoch_radiation_prefix, epoch_webbing_prefix, seed_address, seed_mint_prefix, Direction,
    EdgeAddress, MarkovEdgeAddress, NodeAddress,
};
pub use edge::MarkovEdge;
pub use graph::{GraphEdge, GraphNode, WeightedGraph};
pub use node::MarkovNode;
