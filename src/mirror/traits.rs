//! GraphMirror trait definition
//!
//! Abstract write-through interface for persisting graph mutations,
//! enabling an on-disk store in production and an in-memory one in tests.

use crate::graph::models::{Edge, Node, StateChange};
use anyhow::Result;
use async_trait::async_trait;

/// Write-through persistence for nodes, edges and the state-change log.
///
/// Writes are insert-or-replace keyed by id; change records are append-only.
#[async_trait]
pub trait GraphMirror: Send + Sync {
    /// Insert or replace a node
    async fn upsert_node(&self, node: &Node) -> Result<()>;

    /// Insert or replace an edge
    async fn upsert_edge(&self, edge: &Edge) -> Result<()>;

    /// Append state-change records
    async fn append_changes(&self, changes: &[StateChange]) -> Result<()>;
}
