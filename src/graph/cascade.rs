//! Cascade scenarios: timed reports built from a propagation run.

use super::error::GraphError;
use super::models::StateChange;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Delta injected at the trigger node by an activation wave.
pub const WAVE_DELTA: f64 = 0.3;
/// Spacing between consecutive report events, in milliseconds.
pub const STAGGER_STEP_MS: f64 = 150.0;
/// Jitter added to every staggered event, in milliseconds.
pub const STAGGER_JITTER_MS: (f64, f64) = (50.0, 200.0);

/// Kind of scenario to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    #[default]
    ActivationWave,
}

impl ScenarioKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActivationWave => "activation_wave",
        }
    }
}

impl FromStr for ScenarioKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activation_wave" => Ok(Self::ActivationWave),
            other => Err(GraphError::UnknownScenario(other.to_string())),
        }
    }
}

/// One entry of a scenario report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CascadeEvent {
    /// The initial activation at the trigger node
    Trigger {
        event_id: String,
        node_id: String,
        timestamp: DateTime<Utc>,
        delay_ms: f64,
    },
    /// One recorded state change, placed on the presentation timeline
    CascadeChange {
        event_id: String,
        node_id: String,
        property: String,
        old_value: f64,
        new_value: f64,
        cascade_depth: u32,
        timestamp: DateTime<Utc>,
        delay_ms: f64,
    },
}

impl CascadeEvent {
    pub fn node_id(&self) -> &str {
        match self {
            Self::Trigger { node_id, .. } | Self::CascadeChange { node_id, .. } => node_id,
        }
    }

    pub fn delay_ms(&self) -> f64 {
        match self {
            Self::Trigger { delay_ms, .. } | Self::CascadeChange { delay_ms, .. } => *delay_ms,
        }
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario_id: String,
    pub scenario_type: ScenarioKind,
    pub trigger_node: String,
    pub total_events: usize,
    /// Wall-clock time the run actually took
    pub duration_ms: f64,
    pub events: Vec<CascadeEvent>,
    pub started_at: DateTime<Utc>,
}

/// Presentation offset of the `index`-th change: `index·150 + uniform(50, 200)`.
pub fn stagger_ms<R: Rng + ?Sized>(index: usize, rng: &mut R) -> f64 {
    let (low, high) = STAGGER_JITTER_MS;
    index as f64 * STAGGER_STEP_MS + rng.gen_range(low..high)
}

/// Assemble the report events for an activation wave.
///
/// Timestamps are synthetic: they lay the changes out on a staggered timeline
/// starting at `started_at` and say nothing about when each change executed.
pub fn wave_events<R: Rng + ?Sized>(
    trigger_id: &str,
    started_at: DateTime<Utc>,
    changes: &[StateChange],
    rng: &mut R,
) -> Vec<CascadeEvent> {
    let mut events = Vec::with_capacity(changes.len() + 1);
    events.push(CascadeEvent::Trigger {
        event_id: Uuid::new_v4().to_string(),
        node_id: trigger_id.to_string(),
        timestamp: started_at,
        delay_ms: 0.0,
    });

    for (i, change) in changes.iter().enumerate() {
        let delay_ms = stagger_ms(i, rng);
        events.push(CascadeEvent::CascadeChange {
            event_id: Uuid::new_v4().to_string(),
            node_id: change.node_id.clone(),
            property: change.property_path.clone(),
            old_value: change.old_value,
            new_value: change.new_value,
            cascade_depth: change.cascade_depth,
            timestamp: started_at + ChronoDuration::microseconds((delay_ms * 1000.0) as i64),
            delay_ms,
        });
    }
    events
}
