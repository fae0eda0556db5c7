//! API request handlers

use crate::graph::{
    Edge, EntanglementCandidate, GraphEngine, GraphError, GraphStats, Node, ScenarioKind,
    ScenarioReport, StateChange, TraversalStep,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared server state
pub struct ServerState {
    pub engine: Arc<GraphEngine>,
}

pub type EngineState = Arc<ServerState>;

// ============================================================================
// Health check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub subscribers: usize,
}

pub async fn health(State(state): State<EngineState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subscribers: state.engine.events().subscriber_count(),
    })
}

// ============================================================================
// Graph reads
// ============================================================================

pub async fn get_stats(State(state): State<EngineState>) -> Json<GraphStats> {
    Json(state.engine.stats().await)
}

#[derive(Serialize)]
pub struct NodesResponse {
    pub nodes: Vec<Node>,
}

pub async fn list_nodes(State(state): State<EngineState>) -> Json<NodesResponse> {
    Json(NodesResponse {
        nodes: state.engine.nodes().await,
    })
}

#[derive(Serialize)]
pub struct EdgesResponse {
    pub edges: Vec<Edge>,
}

pub async fn list_edges(State(state): State<EngineState>) -> Json<EdgesResponse> {
    Json(EdgesResponse {
        edges: state.engine.edges().await,
    })
}

fn default_max_depth() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct TraversalQuery {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

#[derive(Serialize)]
pub struct TraversalResponse {
    pub traversal_path: Vec<TraversalStep>,
}

pub async fn traverse(
    State(state): State<EngineState>,
    Path(node_id): Path<String>,
    Query(query): Query<TraversalQuery>,
) -> Json<TraversalResponse> {
    Json(TraversalResponse {
        traversal_path: state.engine.traverse(&node_id, query.max_depth).await,
    })
}

fn default_threshold() -> f64 {
    0.8
}

#[derive(Debug, Deserialize)]
pub struct EntanglementQuery {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

#[derive(Serialize)]
pub struct CandidatesResponse {
    pub candidates: Vec<EntanglementCandidate>,
}

pub async fn entanglement_candidates(
    State(state): State<EngineState>,
    Path(node_id): Path<String>,
    Query(query): Query<EntanglementQuery>,
) -> Json<CandidatesResponse> {
    Json(CandidatesResponse {
        candidates: state
            .engine
            .find_candidates(&node_id, query.threshold)
            .await,
    })
}

// ============================================================================
// Graph mutations
// ============================================================================

#[derive(Serialize)]
pub struct AddNodeResponse {
    pub success: bool,
    pub node_id: String,
}

pub async fn add_node(
    State(state): State<EngineState>,
    Json(node): Json<Node>,
) -> Json<AddNodeResponse> {
    let node_id = node.id.clone();
    let success = state.engine.add_node(node).await;
    Json(AddNodeResponse { success, node_id })
}

#[derive(Serialize)]
pub struct AddEdgeResponse {
    pub success: bool,
    pub edge_id: String,
}

pub async fn add_edge(
    State(state): State<EngineState>,
    Json(edge): Json<Edge>,
) -> Json<AddEdgeResponse> {
    let edge_id = edge.id.clone();
    let success = state.engine.add_edge(edge).await;
    Json(AddEdgeResponse { success, edge_id })
}

#[derive(Debug, Deserialize)]
pub struct PropagateRequest {
    pub node_id: String,
    pub activation_delta: f64,
}

#[derive(Serialize)]
pub struct PropagateResponse {
    pub changes_count: usize,
    pub changes: Vec<StateChange>,
}

pub async fn propagate(
    State(state): State<EngineState>,
    Json(req): Json<PropagateRequest>,
) -> Json<PropagateResponse> {
    let changes = state
        .engine
        .propagate(&req.node_id, req.activation_delta)
        .await;
    Json(PropagateResponse {
        changes_count: changes.len(),
        changes,
    })
}

#[derive(Debug, Deserialize)]
pub struct EntangleRequest {
    pub node1_id: String,
    pub node2_id: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn entangle(
    State(state): State<EngineState>,
    Json(req): Json<EntangleRequest>,
) -> Json<SuccessResponse> {
    Json(SuccessResponse {
        success: state
            .engine
            .create_entanglement(&req.node1_id, &req.node2_id)
            .await,
    })
}

fn default_scenario_type() -> String {
    ScenarioKind::default().as_str().to_string()
}

#[derive(Debug, Deserialize)]
pub struct CascadeRequest {
    pub trigger_node_id: String,
    #[serde(default = "default_scenario_type")]
    pub scenario_type: String,
}

pub async fn run_cascade(
    State(state): State<EngineState>,
    Json(req): Json<CascadeRequest>,
) -> Result<Json<ScenarioReport>, AppError> {
    let kind: ScenarioKind = req.scenario_type.parse()?;
    let report = state.engine.run_cascade(&req.trigger_node_id, kind).await?;
    Ok(Json(report))
}

// ============================================================================
// Error handling
// ============================================================================

/// Handler error. Every failure a handler can report is a `GraphError`
/// rejection, so there is no catch-all 500 variant.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<GraphError> for AppError {
    fn from(err: GraphError) -> Self {
        if err.is_not_found() {
            AppError::NotFound(err.to_string())
        } else {
            AppError::BadRequest(err.to_string())
        }
    }
}
