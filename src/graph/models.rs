//! Semantic graph data models.
//!
//! ## Graph structure
//! - [`NodeType`] / [`Node`]: labeled nodes carrying an activation level
//! - [`EdgeType`] / [`Edge`]: weighted directed relationships
//! - [`DelayProfile`]: latency parameters attached to edges and delay categories
//!
//! ## Operation output
//! - [`StateChange`]: one recorded activation mutation
//! - [`TraversalStep`]: one node reached by a breadth-first walk
//! - [`EntanglementCandidate`]: a node similar enough to be entangled

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The only state path currently mutated by propagation.
pub const ACTIVATION_PATH: &str = "activation_level";

// ============================================================================
// Node / edge categories
// ============================================================================

/// Category of a semantic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Concept,
    Entity,
    Relation,
    Process,
    State,
    Event,
    Temporal,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Entity => "entity",
            Self::Relation => "relation",
            Self::Process => "process",
            Self::State => "state",
            Self::Event => "event",
            Self::Temporal => "temporal",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a directed relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Semantic,
    Causal,
    Temporal,
    Ontological,
    Entangled,
    Cascading,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Causal => "causal",
            Self::Temporal => "temporal",
            Self::Ontological => "ontological",
            Self::Entangled => "entangled",
            Self::Cascading => "cascading",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Delay profile
// ============================================================================

fn default_throttle_factor() -> f64 {
    1.0
}

fn default_cascade_multiplier() -> f64 {
    1.2
}

/// Latency parameters for one operation category or one edge.
///
/// `cascade_multiplier` is persisted with the profile but not consumed by
/// any algorithm yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayProfile {
    pub base_ms: f64,
    pub variance_ms: f64,
    #[serde(default = "default_throttle_factor")]
    pub throttle_factor: f64,
    #[serde(default = "default_cascade_multiplier")]
    pub cascade_multiplier: f64,
}

impl DelayProfile {
    /// Profile with the default throttle (1.0) and cascade multiplier (1.2).
    pub fn new(base_ms: f64, variance_ms: f64) -> Self {
        Self {
            base_ms,
            variance_ms,
            throttle_factor: default_throttle_factor(),
            cascade_multiplier: default_cascade_multiplier(),
        }
    }

    pub fn with_throttle(mut self, throttle_factor: f64) -> Self {
        self.throttle_factor = throttle_factor;
        self
    }

    /// `max(0, base·throttle + uniform(−variance, +variance))`, in milliseconds.
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let base = self.base_ms * self.throttle_factor;
        let variance = self.variance_ms.abs();
        let jitter = if variance > 0.0 {
            rng.gen_range(-variance..=variance)
        } else {
            0.0
        };
        (base + jitter).max(0.0)
    }
}

// ============================================================================
// Node / edge
// ============================================================================

/// A node of the semantic graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub state: BTreeMap<String, serde_json::Value>,
    /// Always within [0, 1]
    #[serde(default)]
    pub activation_level: f64,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub entangled_nodes: BTreeSet<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            properties: BTreeMap::new(),
            state: BTreeMap::new(),
            activation_level: 0.0,
            last_updated: Utc::now(),
            entangled_nodes: BTreeSet::new(),
        }
    }

    pub fn with_activation(mut self, activation: f64) -> Self {
        self.activation_level = clamp_activation(activation);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Clamp into [0, 1]; NaN collapses to 0.
pub fn clamp_activation(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A directed, weighted relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_profile: Option<DelayProfile>,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
            weight: default_weight(),
            properties: BTreeMap::new(),
            delay_profile: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_delay_profile(mut self, profile: DelayProfile) -> Self {
        self.delay_profile = Some(profile);
        self
    }
}

// ============================================================================
// Operation output
// ============================================================================

/// Immutable record of one activation mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub id: String,
    pub node_id: String,
    pub property_path: String,
    pub old_value: f64,
    pub new_value: f64,
    pub timestamp: DateTime<Utc>,
    pub cascade_depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_change_id: Option<String>,
}

/// One node reached by a traversal, in visit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalStep {
    pub node_id: String,
    pub depth: usize,
    pub activation_level: f64,
    pub timestamp: DateTime<Utc>,
}

/// A node similar enough to the source to be entangled with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntanglementCandidate {
    pub node_id: String,
    pub similarity: f64,
    pub activation_diff: f64,
    pub shared_properties: Vec<String>,
}
