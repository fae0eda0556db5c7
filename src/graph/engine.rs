//! Graph engine: the single context object every caller goes through.
//!
//! `GraphEngine` owns the store, the delay provider and the event bus. It is
//! created once by the caller (the server, a CLI command, a test) and shared by
//! handle; there is no global instance.
//!
//! ## Concurrency
//!
//! Mutations (`add_node`, `add_edge`, `propagate`, `create_entanglement`,
//! `run_cascade`) are serialized by one async write gate held for the whole
//! operation, simulated delays included. Reads (`traverse`, `find_candidates`,
//! `stats`) work on a store snapshot and never wait for the gate, so they run
//! concurrently with each other and with an in-flight cascade, which they
//! observe either not at all or in full.
//!
//! ## Events
//!
//! Each operation broadcasts after its store writes (and therefore its mirror
//! writes) have completed. Rejected operations broadcast nothing.

use super::cascade::{wave_events, ScenarioKind, ScenarioReport, WAVE_DELTA};
use super::delay::{DelayModel, DelayProvider};
use super::entanglement::{self, link_edges};
use super::error::GraphError;
use super::models::{Edge, EntanglementCandidate, Node, StateChange, TraversalStep};
use super::propagation;
use super::stats::GraphStats;
use super::store::GraphStore;
use super::traversal;
use crate::events::{EventBus, EventEmitter, GraphEventKind, Subscription};
use crate::mirror::{GraphMirror, MemoryMirror};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

pub struct GraphEngine {
    store: GraphStore,
    delays: Arc<dyn DelayProvider>,
    events: EventBus,
    write_gate: Mutex<()>,
}

impl GraphEngine {
    pub fn new(mirror: Arc<dyn GraphMirror>, delays: Arc<dyn DelayProvider>) -> Self {
        Self {
            store: GraphStore::new(mirror),
            delays,
            events: EventBus::new(),
            write_gate: Mutex::new(()),
        }
    }

    /// In-memory mirror and the default latency model.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMirror::new()), Arc::new(DelayModel::new()))
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Insert or replace a node. Always succeeds.
    pub async fn add_node(&self, node: Node) -> bool {
        let _gate = self.write_gate.lock().await;
        let stored = self.store.upsert_node(node).await;
        debug!(node_id = %stored.id, node_type = %stored.node_type, "Node added");
        self.events.emit_kind(GraphEventKind::NodeAdded { node: stored });
        true
    }

    /// Insert or replace an edge. `false` when either endpoint is unknown.
    pub async fn add_edge(&self, edge: Edge) -> bool {
        let _gate = self.write_gate.lock().await;
        match self.store.insert_edge(edge).await {
            Ok(stored) => {
                debug!(edge_id = %stored.id, edge_type = %stored.edge_type, "Edge added");
                self.events.emit_kind(GraphEventKind::EdgeAdded { edge: stored });
                true
            }
            Err(e) => {
                debug!("Edge rejected: {}", e);
                false
            }
        }
    }

    /// Spread `delta` from `origin_id` through the graph.
    ///
    /// Returns the recorded changes in processing order; empty when the origin
    /// is unknown.
    pub async fn propagate(&self, origin_id: &str, delta: f64) -> Vec<StateChange> {
        let _gate = self.write_gate.lock().await;
        match self.propagate_gated(origin_id, delta).await {
            Ok(changes) => changes,
            Err(e) => {
                debug!("Propagation rejected: {}", e);
                Vec::new()
            }
        }
    }

    /// Caller must hold the write gate.
    async fn propagate_gated(
        &self,
        origin_id: &str,
        delta: f64,
    ) -> Result<Vec<StateChange>, GraphError> {
        let graph = self.store.snapshot().await;
        if !graph.contains_node(origin_id) {
            return Err(GraphError::UnknownNode(origin_id.to_string()));
        }

        let changes = propagation::propagate(&graph, origin_id, delta, self.delays.as_ref()).await;
        self.store.commit_changes(&changes).await;

        debug!(
            origin = origin_id,
            delta,
            changes = changes.len(),
            max_depth = changes.iter().map(|c| c.cascade_depth).max().unwrap_or(0),
            "Activation propagated"
        );
        self.events.emit_kind(GraphEventKind::ActivationPropagated {
            origin_node: origin_id.to_string(),
            changes: changes.clone(),
        });
        Ok(changes)
    }

    /// Entangle two distinct existing nodes. Repeating the call for the same
    /// pair leaves the graph as it was.
    pub async fn create_entanglement(&self, node1_id: &str, node2_id: &str) -> bool {
        let _gate = self.write_gate.lock().await;
        match self.entangle_gated(node1_id, node2_id).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Entanglement rejected: {}", e);
                false
            }
        }
    }

    async fn entangle_gated(&self, node1_id: &str, node2_id: &str) -> Result<(), GraphError> {
        if node1_id == node2_id {
            return Err(GraphError::SelfEntanglement(node1_id.to_string()));
        }
        let links = link_edges(node1_id, node2_id);
        self.store
            .entangle(node1_id, node2_id, links.clone())
            .await?;

        debug!(node1 = node1_id, node2 = node2_id, "Nodes entangled");
        for edge in links {
            self.events.emit_kind(GraphEventKind::EdgeAdded { edge });
        }
        self.events.emit_kind(GraphEventKind::EntanglementCreated {
            node1_id: node1_id.to_string(),
            node2_id: node2_id.to_string(),
        });
        Ok(())
    }

    /// Run a cascade scenario from `trigger_id`.
    pub async fn run_cascade(
        &self,
        trigger_id: &str,
        kind: ScenarioKind,
    ) -> Result<ScenarioReport, GraphError> {
        let _gate = self.write_gate.lock().await;
        let started_at = Utc::now();
        let clock = Instant::now();

        let changes = match kind {
            ScenarioKind::ActivationWave => self.propagate_gated(trigger_id, WAVE_DELTA).await?,
        };

        let events = {
            let mut rng = rand::thread_rng();
            wave_events(trigger_id, started_at, &changes, &mut rng)
        };
        let report = ScenarioReport {
            scenario_id: Uuid::new_v4().to_string(),
            scenario_type: kind,
            trigger_node: trigger_id.to_string(),
            total_events: events.len(),
            duration_ms: clock.elapsed().as_secs_f64() * 1000.0,
            events,
            started_at,
        };

        info!(
            scenario_id = %report.scenario_id,
            scenario_type = kind.as_str(),
            trigger = trigger_id,
            total_events = report.total_events,
            "Cascade scenario complete"
        );
        self.events.emit_kind(GraphEventKind::CascadeScenarioComplete {
            report: report.clone(),
        });
        Ok(report)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Breadth-first walk from `start_id`, at most `max_depth` hops deep.
    pub async fn traverse(&self, start_id: &str, max_depth: usize) -> Vec<TraversalStep> {
        let graph = self.store.snapshot().await;
        if !graph.contains_node(start_id) {
            debug!(start = start_id, "Traversal from unknown node");
            return Vec::new();
        }

        let path = traversal::traverse(&graph, start_id, max_depth, self.delays.as_ref()).await;
        self.events.emit_kind(GraphEventKind::TraversalComplete {
            start_node: start_id.to_string(),
            path: path.clone(),
        });
        path
    }

    /// Up to five nodes similar enough to `node_id`, best first.
    pub async fn find_candidates(&self, node_id: &str, threshold: f64) -> Vec<EntanglementCandidate> {
        let graph = self.store.snapshot().await;
        if !graph.contains_node(node_id) {
            debug!(node = node_id, "Candidate search for unknown node");
            return Vec::new();
        }

        let candidates =
            entanglement::find_candidates(&graph, node_id, threshold, self.delays.as_ref()).await;
        self.events.emit_kind(GraphEventKind::EntanglementCandidatesFound {
            source_node: node_id.to_string(),
            candidates: candidates.clone(),
        });
        candidates
    }

    pub async fn stats(&self) -> GraphStats {
        GraphStats::compute(&*self.store.snapshot().await)
    }

    pub async fn node(&self, id: &str) -> Option<Node> {
        self.store.snapshot().await.node(id).cloned()
    }

    /// All nodes, sorted by id.
    pub async fn nodes(&self) -> Vec<Node> {
        self.store.snapshot().await.nodes().cloned().collect()
    }

    /// All edges, sorted by id.
    pub async fn edges(&self) -> Vec<Edge> {
        self.store.snapshot().await.edges().cloned().collect()
    }

    pub async fn change_log(&self) -> Vec<StateChange> {
        self.store.change_log().await
    }

    // ========================================================================
    // Subscribers
    // ========================================================================

    /// Attach a subscriber. Its first event is `initial_state` with the
    /// current stats; other subscribers do not see it. Holding the write gate
    /// means every mutation shows up either in those stats or as a later event.
    pub async fn subscribe(&self) -> Subscription {
        let _gate = self.write_gate.lock().await;
        let stats = self.stats().await;
        self.events
            .subscribe_with(Some(GraphEventKind::InitialState { stats }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::delay::DelayCategory;
    use crate::graph::models::{EdgeType, NodeType};
    use crate::test_helpers::{
        edge, node, test_engine, test_engine_with_mirror, PausingDelays, RecordingDelays,
    };
    use std::time::Duration;

    #[tokio::test]
    async fn test_add_edge_missing_endpoint_emits_nothing() {
        let engine = test_engine();
        engine.add_node(node("a", 0.5)).await;
        let mut sub = engine.events().subscribe();

        assert!(!engine.add_edge(edge("e1", "a", "ghost", 1.0)).await);
        assert!(sub.drain().is_empty());
        assert_eq!(engine.stats().await.edge_count, 0);
    }

    #[tokio::test]
    async fn test_propagate_commits_and_broadcasts_once() {
        let engine = test_engine();
        engine.add_node(node("a", 0.5)).await;
        engine.add_node(node("b", 0.1)).await;
        engine.add_edge(edge("e1", "a", "b", 1.0)).await;
        let mut sub = engine.events().subscribe();

        let changes = engine.propagate("a", 0.3).await;
        assert_eq!(changes.len(), 2);
        assert!((engine.node("a").await.unwrap().activation_level - 0.8).abs() < 1e-9);
        assert!((engine.node("b").await.unwrap().activation_level - 0.31).abs() < 1e-9);
        assert_eq!(engine.change_log().await.len(), 2);

        let events = sub.drain();
        assert_eq!(events.len(), 1);
        match &events[0].kind {
            GraphEventKind::ActivationPropagated { origin_node, changes: sent } => {
                assert_eq!(origin_node, "a");
                assert_eq!(sent, &changes);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_origin_is_silent() {
        let engine = test_engine();
        let mut sub = engine.events().subscribe();
        assert!(engine.propagate("ghost", 0.3).await.is_empty());
        assert!(engine.traverse("ghost", 3).await.is_empty());
        assert!(engine.find_candidates("ghost", 0.1).await.is_empty());
        assert!(sub.drain().is_empty());
    }

    #[tokio::test]
    async fn test_entanglement_events_in_order() {
        let engine = test_engine();
        engine.add_node(node("a", 0.5)).await;
        engine.add_node(node("b", 0.5)).await;
        let mut sub = engine.events().subscribe();

        assert!(engine.create_entanglement("a", "b").await);
        let tags: Vec<&str> = sub.drain().iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["edge_added", "edge_added", "entanglement_created"]);
    }

    #[tokio::test]
    async fn test_self_entanglement_rejected() {
        let engine = test_engine();
        engine.add_node(node("a", 0.5)).await;
        assert!(!engine.create_entanglement("a", "a").await);
        assert_eq!(engine.stats().await.edge_count, 0);
        assert!(engine.node("a").await.unwrap().entangled_nodes.is_empty());
    }

    #[tokio::test]
    async fn test_run_cascade_unknown_trigger_is_error() {
        let engine = test_engine();
        let err = engine
            .run_cascade("ghost", ScenarioKind::ActivationWave)
            .await
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownNode("ghost".into()));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_run_cascade_report() {
        let engine = test_engine();
        engine.add_node(node("a", 0.5)).await;
        engine.add_node(node("b", 0.1)).await;
        engine.add_edge(edge("e1", "a", "b", 1.0)).await;
        let mut sub = engine.events().subscribe();

        let report = engine
            .run_cascade("a", ScenarioKind::ActivationWave)
            .await
            .unwrap();
        assert_eq!(report.trigger_node, "a");
        assert_eq!(report.total_events, 3);
        assert_eq!(report.events.len(), 3);
        assert!(report.duration_ms >= 0.0);

        let tags: Vec<&str> = sub.drain().iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["activation_propagated", "cascade_scenario_complete"]);
    }

    #[tokio::test]
    async fn test_subscribe_yields_initial_state_first() {
        let engine = test_engine();
        engine.add_node(node("a", 0.4)).await;
        let mut sub = engine.subscribe().await;
        engine.add_node(node("b", 0.4)).await;

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        match &events[0].kind {
            GraphEventKind::InitialState { stats } => assert_eq!(stats.node_count, 1),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(events[1].tag(), "node_added");
    }

    #[tokio::test]
    async fn test_suspension_points() {
        let recorder = Arc::new(RecordingDelays::default());
        let engine = GraphEngine::new(Arc::new(MemoryMirror::new()), recorder.clone());
        engine.add_node(node("a", 0.5)).await;
        engine.add_node(node("b", 0.5)).await;
        engine
            .add_edge(Edge::new("e1", "a", "b", EdgeType::Semantic))
            .await;

        engine.traverse("a", 3).await;
        assert_eq!(
            recorder.take(),
            vec![DelayCategory::Network, DelayCategory::Compute]
        );

        engine.find_candidates("a", 0.0).await;
        assert_eq!(recorder.take(), vec![DelayCategory::Inference]);

        engine.propagate("a", 0.3).await;
        assert_eq!(recorder.take(), vec![DelayCategory::Propagation]);

        engine
            .add_node(Node::new("c", NodeType::Event, "C"))
            .await;
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_written_before_event() {
        let (engine, mirror) = test_engine_with_mirror();
        let engine = Arc::new(engine);
        engine.add_node(node("a", 0.5)).await;
        engine.add_node(node("b", 0.1)).await;
        engine.add_edge(edge("e1", "a", "b", 1.0)).await;
        let mut sub = engine.events().subscribe();

        let worker = engine.clone();
        let task = tokio::spawn(async move { worker.propagate("a", 0.3).await });

        let event = sub.recv().await.unwrap();
        assert_eq!(event.tag(), "activation_propagated");
        assert_eq!(mirror.changes.read().await.len(), 2);
        assert!((mirror.nodes.read().await["b"].activation_level - 0.31).abs() < 1e-9);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_waits_for_in_flight_cascade() {
        let engine = Arc::new(GraphEngine::new(
            Arc::new(MemoryMirror::new()),
            Arc::new(PausingDelays::new(Duration::from_millis(80))),
        ));
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            engine.add_node(node(id, 0.1 * i as f64)).await;
        }
        engine.add_edge(edge("ab", "a", "b", 1.0)).await;
        engine.add_edge(edge("bc", "b", "c", 1.0)).await;

        let writer = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.propagate("a", 0.5).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut sub = engine.subscribe().await;
        match sub.try_recv().map(|e| e.kind) {
            Some(GraphEventKind::InitialState { stats }) => {
                assert_eq!(stats.total_state_changes, 3);
            }
            other => panic!("unexpected greeting {:?}", other),
        }
        assert!(sub.try_recv().is_none());
        assert_eq!(writer.await.unwrap().len(), 3);
    }
}
