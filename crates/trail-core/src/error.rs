//! Error types for graph building, pathfinding and route orchestration.

use crate::graph::NodeId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    /// A node id requested by the caller is not part of the graph.
    #[error("node {node} is not in the routing graph")]
    MissingNode { node: NodeId },

    /// A path references a directed pair with no edge in the edge map.
    /// Means the builder and pathfinder disagree on the graph shape.
    #[error("path step {from} -> {to} has no edge in the routing graph")]
    MissingEdge { from: NodeId, to: NodeId },

    #[error("a route computation is already in progress")]
    ComputationInFlight,

    #[error("route computation was cancelled")]
    Cancelled,

    #[error("invalid route: {0}")]
    InvalidRoute(String),
}

pub type Result<T> = std::result::Result<T, RoutingError>;
