//! Typed rejections for graph operations.

use thiserror::Error;

/// Why a graph operation was rejected.
///
/// Engine operations surface these as `false` / empty results at the public
/// boundary, except scenario execution which returns the error itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    UnknownNode(String),

    #[error("Edge {edge_id} references missing node {node_id}")]
    MissingEndpoint { edge_id: String, node_id: String },

    #[error("Node {0} cannot be entangled with itself")]
    SelfEntanglement(String),

    #[error("Unknown scenario type: {0}")]
    UnknownScenario(String),
}

impl GraphError {
    /// True when the error is caused by a node id that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownNode(_) | Self::MissingEndpoint { .. })
    }
}
