//! Sample graph used by `serve` and the `demo` command.

use super::engine::GraphEngine;
use super::models::{DelayProfile, Edge, EdgeType, Node, NodeType};
use tracing::info;

fn sample_nodes() -> Vec<Node> {
    vec![
        Node::new("concept-1", NodeType::Concept, "Emergence")
            .with_property("domain", "philosophy")
            .with_activation(0.7),
        Node::new("entity-1", NodeType::Entity, "Agent-Alpha")
            .with_property("specialty", "tactical")
            .with_activation(0.5),
        Node::new("process-1", NodeType::Process, "State-Cascade")
            .with_property("pattern", "wave")
            .with_activation(0.3),
        Node::new("state-1", NodeType::State, "System-Ready")
            .with_property("status", "active")
            .with_activation(0.8),
        Node::new("event-1", NodeType::Event, "User-Intent-Received")
            .with_property("action", "explore")
            .with_activation(0.6),
        Node::new("temporal-1", NodeType::Temporal, "T-Plus-300ms")
            .with_property("sequence", 1)
            .with_activation(0.4),
    ]
}

fn sample_edges() -> Vec<Edge> {
    vec![
        Edge::new("sem-1", "concept-1", "entity-1", EdgeType::Semantic)
            .with_weight(0.8)
            .with_delay_profile(DelayProfile::new(100.0, 30.0)),
        Edge::new("caus-1", "event-1", "process-1", EdgeType::Causal)
            .with_weight(0.9)
            .with_delay_profile(DelayProfile::new(200.0, 50.0)),
        Edge::new("temp-1", "temporal-1", "state-1", EdgeType::Temporal)
            .with_weight(0.7)
            .with_delay_profile(DelayProfile::new(50.0, 20.0)),
        Edge::new("casc-1", "process-1", "state-1", EdgeType::Cascading)
            .with_weight(1.0)
            .with_delay_profile(DelayProfile::new(150.0, 40.0)),
    ]
}

/// Load the six sample nodes and four edges into `engine`.
pub async fn seed_sample_graph(engine: &GraphEngine) {
    for node in sample_nodes() {
        engine.add_node(node).await;
    }
    let mut edges = 0;
    for edge in sample_edges() {
        if engine.add_edge(edge).await {
            edges += 1;
        }
    }
    info!(nodes = 6, edges, "Sample graph loaded");
}
