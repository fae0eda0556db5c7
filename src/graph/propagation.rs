//! Activation cascade.
//!
//! A delta applied to one node spreads breadth-first along outgoing edges,
//! attenuated by edge weight and by `0.7^(depth+1)` per hop. The cascade runs
//! against a snapshot with a private activation overlay; the caller commits the
//! returned changes in one step.
//!
//! Only a recorded change (a move of more than 0.01) passes its delta on to
//! neighbours; a saturated or barely moved node ends its branch.
//!
//! Nodes are not deduplicated across queue entries: a node reached through
//! several paths is processed once per entry, each time against its latest
//! overlay value.

use super::delay::{DelayCategory, DelayProvider};
use super::models::{clamp_activation, StateChange, ACTIVATION_PATH};
use super::store::GraphState;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Entries deeper than this are discarded.
pub const MAX_CASCADE_DEPTH: u32 = 3;
/// Activation moves at or below this are not recorded.
pub const SIGNIFICANT_CHANGE: f64 = 0.01;
/// Propagated deltas at or below this are not enqueued.
pub const MIN_PROPAGATION: f64 = 0.005;
/// Per-hop attenuation base.
pub const DECAY_BASE: f64 = 0.7;

/// Attenuation applied to deltas leaving a node at `depth`.
pub fn decay_factor(depth: u32) -> f64 {
    DECAY_BASE.powi(depth as i32 + 1)
}

struct QueueEntry {
    node_id: String,
    delta: f64,
    depth: u32,
    /// Change recorded at the upstream node that enqueued this entry
    cause: Option<String>,
}

/// Run a cascade from `origin_id` over `graph`.
///
/// Returns the recorded changes in processing order, or an empty list when the
/// origin does not exist. Suspends for a PROPAGATION delay after each
/// recorded change while entries remain.
pub async fn propagate(
    graph: &GraphState,
    origin_id: &str,
    delta: f64,
    delays: &dyn DelayProvider,
) -> Vec<StateChange> {
    if !graph.contains_node(origin_id) || !delta.is_finite() {
        return Vec::new();
    }

    let mut overlay: HashMap<String, f64> = HashMap::new();
    let mut changes = Vec::new();
    let mut queue = VecDeque::from([QueueEntry {
        node_id: origin_id.to_string(),
        delta,
        depth: 0,
        cause: None,
    }]);

    while let Some(entry) = queue.pop_front() {
        if entry.depth > MAX_CASCADE_DEPTH {
            continue;
        }
        let Some(node) = graph.node(&entry.node_id) else {
            continue;
        };

        let old_value = overlay
            .get(&entry.node_id)
            .copied()
            .unwrap_or(node.activation_level);
        let new_value = clamp_activation(old_value + entry.delta);

        if (new_value - old_value).abs() <= SIGNIFICANT_CHANGE {
            continue;
        }

        let change = StateChange {
            id: Uuid::new_v4().to_string(),
            node_id: entry.node_id.clone(),
            property_path: ACTIVATION_PATH.to_string(),
            old_value,
            new_value,
            timestamp: Utc::now(),
            cascade_depth: entry.depth,
            origin_change_id: entry.cause.clone(),
        };
        overlay.insert(entry.node_id.clone(), new_value);

        let decay = decay_factor(entry.depth);
        for edge in graph.outgoing(&entry.node_id) {
            let propagated = entry.delta * edge.weight * decay;
            if propagated.abs() > MIN_PROPAGATION && entry.depth < MAX_CASCADE_DEPTH {
                queue.push_back(QueueEntry {
                    node_id: edge.target_id.clone(),
                    delta: propagated,
                    depth: entry.depth + 1,
                    cause: Some(change.id.clone()),
                });
            }
        }
        changes.push(change);

        if !queue.is_empty() {
            delays.suspend(DelayCategory::Propagation).await;
        }
    }

    changes
}
