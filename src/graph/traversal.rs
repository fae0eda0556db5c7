//! Read-only breadth-first walk.

use super::delay::{DelayCategory, DelayProvider};
use super::models::TraversalStep;
use super::store::GraphState;
use chrono::Utc;
use std::collections::{HashSet, VecDeque};

/// Hard cap on the number of nodes a single traversal returns.
pub const MAX_TRAVERSAL_RESULTS: usize = 50;

/// Walk outgoing edges from `start_id`, visiting each node at most once and
/// never deeper than `max_depth`.
///
/// Suspends for a NETWORK delay before the first dequeue and for a COMPUTE
/// delay between dequeues. Unknown start ids yield an empty path without
/// suspending.
pub async fn traverse(
    graph: &GraphState,
    start_id: &str,
    max_depth: usize,
    delays: &dyn DelayProvider,
) -> Vec<TraversalStep> {
    if !graph.contains_node(start_id) {
        return Vec::new();
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(start_id, 0)]);
    let mut path = Vec::new();

    delays.suspend(DelayCategory::Network).await;

    while path.len() < MAX_TRAVERSAL_RESULTS {
        let Some((current_id, depth)) = queue.pop_front() else {
            break;
        };
        if depth > max_depth || visited.contains(current_id) {
            continue;
        }
        let Some(node) = graph.node(current_id) else {
            continue;
        };
        visited.insert(current_id);

        path.push(TraversalStep {
            node_id: node.id.clone(),
            depth,
            activation_level: node.activation_level,
            timestamp: Utc::now(),
        });

        for edge in graph.outgoing(current_id) {
            if !visited.contains(edge.target_id.as_str()) {
                queue.push_back((edge.target_id.as_str(), depth + 1));
            }
        }

        if !queue.is_empty() {
            delays.suspend(DelayCategory::Compute).await;
        }
    }

    path
}
