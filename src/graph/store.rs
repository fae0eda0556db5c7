//! Graph store: owns the node/edge collections, the change log and the mirror.
//!
//! The live graph is an `Arc<GraphState>` behind a `tokio::sync::RwLock`.
//! Readers take an O(1) snapshot (`Arc` clone) and never observe a half-applied
//! write; writers copy-on-write through `Arc::make_mut`, so a snapshot held by a
//! slow reader stays valid while the live graph moves on.
//!
//! Every store mutation awaits its mirror write before returning. Callers
//! broadcast events only after that, so anything a subscriber observes has
//! already been handed to the mirror.

use super::error::GraphError;
use super::models::{clamp_activation, Edge, Node, StateChange};
use crate::mirror::GraphMirror;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

// ============================================================================
// GraphState (copy-on-write snapshot)
// ============================================================================

/// Point-in-time view of the graph.
///
/// Nodes and edges are kept in id order so every walk over the graph is
/// deterministic. Outgoing edges are indexed by source id.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Edge>,
    outgoing: HashMap<String, BTreeSet<String>>,
    change_count: usize,
}

impl GraphState {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Outgoing edges of a node, in edge-id order.
    pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(node_id)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.edges.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of entries in the state-change log when the snapshot was taken.
    pub fn change_count(&self) -> usize {
        self.change_count
    }

    /// Entanglement membership is owned by `GraphStore::entangle`: a
    /// replacement keeps the previous node's set and an incoming set is ignored.
    fn insert_node(&mut self, mut node: Node) -> Node {
        node.entangled_nodes = self
            .nodes
            .get(&node.id)
            .map(|previous| previous.entangled_nodes.clone())
            .unwrap_or_default();
        self.nodes.insert(node.id.clone(), node.clone());
        node
    }

    /// Endpoint check and insertion in one step; on error nothing changes.
    fn insert_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        for endpoint in [&edge.source_id, &edge.target_id] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::MissingEndpoint {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }

        if let Some(previous) = self.edges.get(&edge.id) {
            if previous.source_id != edge.source_id {
                let old_source = previous.source_id.clone();
                if let Some(ids) = self.outgoing.get_mut(&old_source) {
                    ids.remove(&edge.id);
                    if ids.is_empty() {
                        self.outgoing.remove(&old_source);
                    }
                }
            }
        }

        self.outgoing
            .entry(edge.source_id.clone())
            .or_default()
            .insert(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }
}

// ============================================================================
// GraphStore
// ============================================================================

/// Owner of all nodes, edges and state-change records.
pub struct GraphStore {
    state: RwLock<Arc<GraphState>>,
    change_log: RwLock<Vec<StateChange>>,
    mirror: Arc<dyn GraphMirror>,
}

impl GraphStore {
    pub fn new(mirror: Arc<dyn GraphMirror>) -> Self {
        Self {
            state: RwLock::new(Arc::new(GraphState::default())),
            change_log: RwLock::new(Vec::new()),
            mirror,
        }
    }

    /// Consistent read-only view of the current graph.
    pub async fn snapshot(&self) -> Arc<GraphState> {
        self.state.read().await.clone()
    }

    /// Insert or replace a node. Activation is clamped into [0, 1].
    ///
    /// Returns the stored node.
    pub async fn upsert_node(&self, mut node: Node) -> Node {
        node.activation_level = clamp_activation(node.activation_level);
        let stored = {
            let mut guard = self.state.write().await;
            Arc::make_mut(&mut guard).insert_node(node)
        };
        self.mirror_node(&stored).await;
        stored
    }

    /// Insert or replace an edge whose endpoints both exist.
    pub async fn insert_edge(&self, edge: Edge) -> Result<Edge, GraphError> {
        {
            let mut guard = self.state.write().await;
            Arc::make_mut(&mut guard).insert_edge(edge.clone())?;
        }
        self.mirror_edge(&edge).await;
        Ok(edge)
    }

    /// Apply recorded activation changes in order and append them to the log.
    ///
    /// All changes become visible to readers at once.
    pub async fn commit_changes(&self, changes: &[StateChange]) {
        if changes.is_empty() {
            return;
        }

        let touched: Vec<Node> = {
            let mut guard = self.state.write().await;
            let state = Arc::make_mut(&mut guard);
            let mut touched_ids = BTreeSet::new();
            for change in changes {
                if let Some(node) = state.nodes.get_mut(&change.node_id) {
                    node.activation_level = clamp_activation(change.new_value);
                    node.last_updated = change.timestamp;
                    touched_ids.insert(change.node_id.clone());
                }
            }
            state.change_count += changes.len();
            touched_ids
                .iter()
                .filter_map(|id| state.nodes.get(id).cloned())
                .collect()
        };
        self.change_log.write().await.extend_from_slice(changes);

        for node in &touched {
            self.mirror_node(node).await;
        }
        if let Err(e) = self.mirror.append_changes(changes).await {
            warn!(count = changes.len(), "Failed to mirror state changes: {}", e);
        }
    }

    /// Mark two distinct nodes as entangled and insert their link edges,
    /// all under one write lock.
    ///
    /// Returns the two updated nodes.
    pub async fn entangle(
        &self,
        a: &str,
        b: &str,
        links: [Edge; 2],
    ) -> Result<(Node, Node), GraphError> {
        let (node_a, node_b) = {
            let mut guard = self.state.write().await;
            for id in [a, b] {
                if !guard.contains_node(id) {
                    return Err(GraphError::UnknownNode(id.to_string()));
                }
            }

            let state = Arc::make_mut(&mut guard);
            for (id, other) in [(a, b), (b, a)] {
                if let Some(node) = state.nodes.get_mut(id) {
                    node.entangled_nodes.insert(other.to_string());
                }
            }
            for link in links.iter().cloned() {
                state.insert_edge(link)?;
            }

            match (state.nodes.get(a), state.nodes.get(b)) {
                (Some(na), Some(nb)) => (na.clone(), nb.clone()),
                _ => return Err(GraphError::UnknownNode(a.to_string())),
            }
        };

        self.mirror_node(&node_a).await;
        self.mirror_node(&node_b).await;
        for link in &links {
            self.mirror_edge(link).await;
        }
        Ok((node_a, node_b))
    }

    /// Copy of the full state-change log, oldest first.
    pub async fn change_log(&self) -> Vec<StateChange> {
        self.change_log.read().await.clone()
    }

    async fn mirror_node(&self, node: &Node) {
        if let Err(e) = self.mirror.upsert_node(node).await {
            warn!(node_id = %node.id, "Failed to mirror node: {}", e);
        }
    }

    async fn mirror_edge(&self, edge: &Edge) {
        if let Err(e) = self.mirror.upsert_edge(edge).await {
            warn!(edge_id = %edge.id, "Failed to mirror edge: {}", e);
        }
    }
}
