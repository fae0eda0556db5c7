//! Sled-backed mirror.
//!
//! One tree per collection, values stored as JSON. Change records are keyed by
//! a monotonically generated id so iteration returns them in append order.

use super::traits::GraphMirror;
use crate::graph::models::{Edge, Node, StateChange};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

const NODES_TREE: &str = "nodes";
const EDGES_TREE: &str = "edges";
const CHANGES_TREE: &str = "state_changes";

/// Durable mirror in an embedded sled database.
pub struct SledMirror {
    db: sled::Db,
    nodes: sled::Tree,
    edges: sled::Tree,
    changes: sled::Tree,
}

impl SledMirror {
    /// Open (or create) a mirror at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .with_context(|| format!("Failed to open sled mirror at {}", path.display()))?;
        Self::from_db(db)
    }

    /// Create a mirror that is deleted when dropped
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .context("Failed to open temporary sled mirror")?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            nodes: db.open_tree(NODES_TREE)?,
            edges: db.open_tree(EDGES_TREE)?,
            changes: db.open_tree(CHANGES_TREE)?,
            db,
        })
    }

    /// Read back a mirrored node
    pub fn node(&self, id: &str) -> Result<Option<Node>> {
        match self.nodes.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read back a mirrored edge
    pub fn edge(&self, id: &str) -> Result<Option<Edge>> {
        match self.edges.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All mirrored change records, in append order
    pub fn changes(&self) -> Result<Vec<StateChange>> {
        self.changes
            .iter()
            .values()
            .map(|value| Ok(serde_json::from_slice(&value?)?))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[async_trait]
impl GraphMirror for SledMirror {
    async fn upsert_node(&self, node: &Node) -> Result<()> {
        self.nodes
            .insert(node.id.as_bytes(), serde_json::to_vec(node)?)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn upsert_edge(&self, edge: &Edge) -> Result<()> {
        self.edges
            .insert(edge.id.as_bytes(), serde_json::to_vec(edge)?)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn append_changes(&self, changes: &[StateChange]) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut batch = sled::Batch::default();
        for change in changes {
            let key = self.db.generate_id()?.to_be_bytes().to_vec();
            batch.insert(key, serde_json::to_vec(change)?);
        }
        self.changes.apply_batch(batch)?;
        self.db.flush_async().await?;
        Ok(())
    }
}
