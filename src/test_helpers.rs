//! Test helper factories and engine builders
//!
//! Provides convenience functions for creating test objects with sensible defaults,
//! and a delay provider that records every suspension instead of sleeping.
#![allow(dead_code)]

use crate::api::{self, ServerState};
use crate::graph::delay::{DelayCategory, DelayProvider};
use crate::graph::models::{Edge, EdgeType, Node, NodeType};
use crate::graph::{GraphEngine, NoDelay};
use crate::mirror::MemoryMirror;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Engine builders
// ============================================================================

/// Engine with an in-memory mirror and no simulated latency
pub fn test_engine() -> GraphEngine {
    GraphEngine::new(Arc::new(MemoryMirror::new()), Arc::new(NoDelay))
}

/// Engine plus a handle on its mirror
pub fn test_engine_with_mirror() -> (GraphEngine, Arc<MemoryMirror>) {
    let mirror = Arc::new(MemoryMirror::new());
    let engine = GraphEngine::new(mirror.clone(), Arc::new(NoDelay));
    (engine, mirror)
}

/// Router over a fresh zero-latency engine
pub fn test_router() -> (axum::Router, Arc<GraphEngine>) {
    let engine = Arc::new(test_engine());
    let router = api::create_router(Arc::new(ServerState {
        engine: engine.clone(),
    }));
    (router, engine)
}

// ============================================================================
// Factories
// ============================================================================

pub fn node(id: &str, activation: f64) -> Node {
    Node::new(id, NodeType::Concept, id).with_activation(activation)
}

pub fn edge(id: &str, source: &str, target: &str, weight: f64) -> Edge {
    Edge::new(id, source, target, EdgeType::Causal).with_weight(weight)
}

// ============================================================================
// Recording delay provider
// ============================================================================

/// Never sleeps; remembers the category of every suspension in order.
#[derive(Debug, Default)]
pub struct RecordingDelays {
    calls: Mutex<Vec<DelayCategory>>,
}

impl RecordingDelays {
    /// Recorded categories since the last call, oldest first
    pub fn take(&self) -> Vec<DelayCategory> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

impl DelayProvider for RecordingDelays {
    fn sample(&self, category: DelayCategory) -> Duration {
        self.calls.lock().unwrap().push(category);
        Duration::ZERO
    }
}

// ============================================================================
// Pausing delay provider
// ============================================================================

/// Sleeps a fixed time between propagation hops and nowhere else, so a test
/// can act while a cascade is suspended.
#[derive(Debug)]
pub struct PausingDelays {
    hop: Duration,
}

impl PausingDelays {
    pub fn new(hop: Duration) -> Self {
        Self { hop }
    }
}

impl DelayProvider for PausingDelays {
    fn sample(&self, category: DelayCategory) -> Duration {
        match category {
            DelayCategory::Propagation => self.hop,
            _ => Duration::ZERO,
        }
    }
}
