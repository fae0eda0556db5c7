//! Entanglement matching.
//!
//! Similarity between two nodes is the mean of
//! - activation similarity: `1 − |a.activation − b.activation|`
//! - property similarity: shared property keys over the larger key count
//!   (0 when nothing is shared)
//!
//! An entanglement is a symmetric relationship: both nodes list each other in
//! `entangled_nodes` and two directed ENTANGLED edges link them. Edge ids are
//! derived from the ordered pair, so re-entangling replaces instead of adding.

use super::delay::{DelayCategory, DelayProvider};
use super::models::{DelayProfile, Edge, EdgeType, EntanglementCandidate, Node};
use super::store::GraphState;

/// Maximum number of candidates returned by one search.
pub const MAX_CANDIDATES: usize = 5;

/// Combined similarity of two nodes, in [0, 1].
pub fn similarity(source: &Node, candidate: &Node) -> f64 {
    let activation_similarity = 1.0 - (source.activation_level - candidate.activation_level).abs();
    let shared = shared_properties(source, candidate).len();
    let property_similarity = if shared == 0 {
        0.0
    } else {
        shared as f64 / source.properties.len().max(candidate.properties.len()) as f64
    };
    (activation_similarity + property_similarity) / 2.0
}

/// Property keys present on both nodes, sorted.
fn shared_properties(source: &Node, candidate: &Node) -> Vec<String> {
    source
        .properties
        .keys()
        .filter(|k| candidate.properties.contains_key(*k))
        .cloned()
        .collect()
}

/// Score every other node against `node_id` and return the best matches at or
/// above `threshold`, highest similarity first.
///
/// Suspends once for an INFERENCE delay before scoring. Unknown ids yield an
/// empty list without suspending.
pub async fn find_candidates(
    graph: &GraphState,
    node_id: &str,
    threshold: f64,
    delays: &dyn DelayProvider,
) -> Vec<EntanglementCandidate> {
    let Some(source) = graph.node(node_id) else {
        return Vec::new();
    };

    delays.suspend(DelayCategory::Inference).await;

    let mut candidates: Vec<EntanglementCandidate> = graph
        .nodes()
        .filter(|candidate| candidate.id != source.id)
        .filter_map(|candidate| {
            let score = similarity(source, candidate);
            (score >= threshold).then(|| EntanglementCandidate {
                node_id: candidate.id.clone(),
                similarity: score,
                activation_diff: (source.activation_level - candidate.activation_level).abs(),
                shared_properties: shared_properties(source, candidate),
            })
        })
        .collect();

    // Stable: equal scores keep node-id order
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    candidates.truncate(MAX_CANDIDATES);
    candidates
}

/// Low-latency profile carried by entanglement edges.
pub fn link_profile() -> DelayProfile {
    DelayProfile::new(10.0, 5.0).with_throttle(0.5)
}

/// Deterministic id of the directed link `from → to`.
pub fn link_id(from: &str, to: &str) -> String {
    format!("entangle_{}_{}", from, to)
}

/// The two directed ENTANGLED edges for a pair.
pub fn link_edges(a: &str, b: &str) -> [Edge; 2] {
    [
        Edge::new(link_id(a, b), a, b, EdgeType::Entangled).with_delay_profile(link_profile()),
        Edge::new(link_id(b, a), b, a, EdgeType::Entangled).with_delay_profile(link_profile()),
    ]
}
