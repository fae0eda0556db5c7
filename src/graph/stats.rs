//! Graph-wide metrics, recomputed from a snapshot on every call.

use super::models::{EdgeType, NodeType};
use super::store::GraphState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate metrics over the whole graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Half the total size of all `entangled_nodes` sets
    pub entangled_pairs: usize,
    /// 0 for an empty graph
    pub average_activation: f64,
    pub node_types: BTreeMap<NodeType, usize>,
    pub edge_types: BTreeMap<EdgeType, usize>,
    pub total_state_changes: usize,
    pub timestamp: String,
}

impl GraphStats {
    pub fn compute(graph: &GraphState) -> Self {
        let mut node_types = BTreeMap::new();
        let mut edge_types = BTreeMap::new();
        let mut entangled_links = 0usize;
        let mut total_activation = 0.0;

        for node in graph.nodes() {
            *node_types.entry(node.node_type).or_insert(0) += 1;
            entangled_links += node.entangled_nodes.len();
            total_activation += node.activation_level;
        }
        for edge in graph.edges() {
            *edge_types.entry(edge.edge_type).or_insert(0) += 1;
        }

        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            entangled_pairs: entangled_links / 2,
            average_activation: total_activation / graph.node_count().max(1) as f64,
            node_types,
            edge_types,
            total_state_changes: graph.change_count(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::models::{Edge, Node};
    use crate::graph::store::GraphStore;
    use crate::mirror::MemoryMirror;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_graph() {
        let store = GraphStore::new(Arc::new(MemoryMirror::new()));
        let stats = GraphStats::compute(&*store.snapshot().await);
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.average_activation, 0.0);
        assert!(stats.node_types.is_empty());
    }

    #[tokio::test]
    async fn test_counts_and_average() {
        let store = GraphStore::new(Arc::new(MemoryMirror::new()));
        store
            .upsert_node(Node::new("a", NodeType::Concept, "A").with_activation(0.2))
            .await;
        store
            .upsert_node(Node::new("b", NodeType::Concept, "B").with_activation(0.6))
            .await;
        store
            .upsert_node(Node::new("c", NodeType::Event, "C").with_activation(0.7))
            .await;
        store
            .insert_edge(Edge::new("e1", "a", "b", EdgeType::Causal))
            .await
            .unwrap();

        let stats = GraphStats::compute(&*store.snapshot().await);
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 1);
        assert!((stats.average_activation - 0.5).abs() < 1e-12);
        assert_eq!(stats.node_types[&NodeType::Concept], 2);
        assert_eq!(stats.node_types[&NodeType::Event], 1);
        assert_eq!(stats.edge_types[&EdgeType::Causal], 1);
        assert_eq!(stats.entangled_pairs, 0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["node_types"]["concept"], 2);
    }
}
