//! Cascading activation graph.
//!
//! A labeled directed graph whose nodes carry an activation level in [0, 1].
//! A change at one node spreads to its neighbours with per-hop decay; every
//! operation is paced by a simulated latency model and announced on the
//! event bus.
//!
//! ## Architecture
//!
//! ```text
//!                    GraphEngine (write gate, events)
//!                 ┌───────┬───────┼────────┬─────────┐
//!          propagation traversal entanglement cascade stats
//!                 └───────┴───────┼────────┴─────────┘
//!                            GraphStore ──► GraphMirror (sled / memory)
//! ```
//!
//! ## Modules
//!
//! - [`models`]: Node, Edge, StateChange and friends
//! - [`delay`]: latency categories, `DelayModel`, `DelayProvider`
//! - [`store`]: copy-on-write graph state and change log
//! - [`propagation`]: depth-bounded activation cascade
//! - [`traversal`]: breadth-first walk
//! - [`entanglement`]: similarity search and symmetric links
//! - [`cascade`]: scenario reports
//! - [`stats`]: aggregate metrics
//! - [`engine`]: `GraphEngine`, the entry point for all callers
//! - [`seed`]: sample graph

pub mod cascade;
pub mod delay;
pub mod engine;
pub mod entanglement;
pub mod error;
pub mod models;
pub mod propagation;
pub mod seed;
pub mod stats;
pub mod store;
pub mod traversal;

// Re-export primary types for convenience
pub use cascade::{CascadeEvent, ScenarioKind, ScenarioReport};
pub use delay::{DelayCategory, DelayModel, DelayProvider, NoDelay};
pub use engine::GraphEngine;
pub use error::GraphError;
pub use models::{
    DelayProfile, Edge, EdgeType, EntanglementCandidate, Node, NodeType, StateChange,
    TraversalStep,
};
pub use seed::seed_sample_graph;
pub use stats::GraphStats;
pub use store::{GraphState, GraphStore};
