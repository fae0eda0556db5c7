//! In-memory mirror.
//!
//! Used when no mirror path is configured, and by tests that need to check
//! what was persisted and when.

use super::traits::GraphMirror;
use crate::graph::models::{Edge, Node, StateChange};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Mirror backed by `tokio::sync::RwLock<HashMap<..>>` collections.
#[derive(Default)]
pub struct MemoryMirror {
    pub nodes: RwLock<HashMap<String, Node>>,
    pub edges: RwLock<HashMap<String, Edge>>,
    pub changes: RwLock<Vec<StateChange>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphMirror for MemoryMirror {
    async fn upsert_node(&self, node: &Node) -> Result<()> {
        self.nodes.write().await.insert(node.id.clone(), node.clone());
        Ok(())
    }

    async fn upsert_edge(&self, edge: &Edge) -> Result<()> {
        self.edges.write().await.insert(edge.id.clone(), edge.clone());
        Ok(())
    }

    async fn append_changes(&self, changes: &[StateChange]) -> Result<()> {
        self.changes.write().await.extend_from_slice(changes);
        Ok(())
    }
}
