//! Graph event types for WebSocket notifications

use crate::graph::cascade::ScenarioReport;
use crate::graph::models::{Edge, EntanglementCandidate, Node, StateChange, TraversalStep};
use crate::graph::stats::GraphStats;
use serde::{Deserialize, Serialize};

/// What happened, with its payload. Serialized under a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEventKind {
    NodeAdded {
        node: Node,
    },
    EdgeAdded {
        edge: Edge,
    },
    ActivationPropagated {
        origin_node: String,
        changes: Vec<StateChange>,
    },
    EntanglementCreated {
        node1_id: String,
        node2_id: String,
    },
    TraversalComplete {
        start_node: String,
        path: Vec<TraversalStep>,
    },
    EntanglementCandidatesFound {
        source_node: String,
        candidates: Vec<EntanglementCandidate>,
    },
    /// Report fields sit beside `type` rather than under a nested key
    CascadeScenarioComplete {
        #[serde(flatten)]
        report: ScenarioReport,
    },
    /// First event every new subscriber receives
    InitialState {
        stats: GraphStats,
    },
    /// Reply to a subscriber's explicit stats request
    StatsUpdate {
        stats: GraphStats,
    },
}

impl GraphEventKind {
    /// The wire `type` tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NodeAdded { .. } => "node_added",
            Self::EdgeAdded { .. } => "edge_added",
            Self::ActivationPropagated { .. } => "activation_propagated",
            Self::EntanglementCreated { .. } => "entanglement_created",
            Self::TraversalComplete { .. } => "traversal_complete",
            Self::EntanglementCandidatesFound { .. } => "entanglement_candidates_found",
            Self::CascadeScenarioComplete { .. } => "cascade_scenario_complete",
            Self::InitialState { .. } => "initial_state",
            Self::StatsUpdate { .. } => "stats_update",
        }
    }
}

/// A graph event as delivered to subscribers.
///
/// Must be Clone: every subscriber gets its own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEvent {
    #[serde(flatten)]
    pub kind: GraphEventKind,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl GraphEvent {
    /// Create a new GraphEvent with the current timestamp
    pub fn new(kind: GraphEventKind) -> Self {
        Self {
            kind,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }
}

/// Trait for emitting graph events.
///
/// Emission is fire-and-forget: it never blocks and never fails the caller.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: GraphEvent);

    fn emit_kind(&self, kind: GraphEventKind) {
        self.emit(GraphEvent::new(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::cascade::ScenarioKind;
    use crate::graph::models::NodeType;
    use chrono::Utc;

    #[test]
    fn test_event_serializes_flat_with_type_tag() {
        let event = GraphEvent::new(GraphEventKind::EntanglementCreated {
            node1_id: "a".into(),
            node2_id: "b".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "entanglement_created");
        assert_eq!(json["node1_id"], "a");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_tag_matches_serde_name() {
        let kinds = vec![
            GraphEventKind::NodeAdded {
                node: Node::new("n", NodeType::State, "N"),
            },
            GraphEventKind::ActivationPropagated {
                origin_node: "n".into(),
                changes: vec![],
            },
            GraphEventKind::TraversalComplete {
                start_node: "n".into(),
                path: vec![],
            },
            GraphEventKind::EntanglementCandidatesFound {
                source_node: "n".into(),
                candidates: vec![],
            },
        ];
        for kind in kinds {
            let json = serde_json::to_value(GraphEvent::new(kind.clone())).unwrap();
            assert_eq!(json["type"], kind.tag());
        }
    }

    #[test]
    fn test_event_roundtrip() {
        let event = GraphEvent::new(GraphEventKind::NodeAdded {
            node: Node::new("n", NodeType::Relation, "N").with_activation(0.25),
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: GraphEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tag(), "node_added");
        assert_eq!(back.timestamp, event.timestamp);
    }

    #[test]
    fn test_scenario_report_fields_are_top_level() {
        let report = ScenarioReport {
            scenario_id: "s1".into(),
            scenario_type: ScenarioKind::ActivationWave,
            trigger_node: "n".into(),
            total_events: 0,
            duration_ms: 12.5,
            events: vec![],
            started_at: Utc::now(),
        };
        let event = GraphEvent::new(GraphEventKind::CascadeScenarioComplete {
            report: report.clone(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cascade_scenario_complete");
        assert_eq!(json["scenario_id"], "s1");
        assert_eq!(json["scenario_type"], "activation_wave");
        assert_eq!(json["trigger_node"], "n");
        assert!(json.get("report").is_none());

        let back: GraphEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, GraphEventKind::CascadeScenarioComplete { report });
    }
}
