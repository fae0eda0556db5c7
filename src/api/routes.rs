//! API route definitions

use super::handlers::{self, EngineState};
use super::ws_handlers;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: EngineState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // ====================================================================
        // Graph reads
        // ====================================================================
        .route("/api/graph/stats", get(handlers::get_stats))
        .route(
            "/api/graph/nodes",
            get(handlers::list_nodes).post(handlers::add_node),
        )
        .route(
            "/api/graph/edges",
            get(handlers::list_edges).post(handlers::add_edge),
        )
        .route(
            "/api/graph/traversal/{node_id}",
            get(handlers::traverse),
        )
        .route(
            "/api/graph/entanglement/{node_id}",
            get(handlers::entanglement_candidates),
        )
        // ====================================================================
        // Graph operations
        // ====================================================================
        .route("/api/graph/propagate", post(handlers::propagate))
        .route("/api/graph/entangle", post(handlers::entangle))
        .route("/api/graph/cascade", post(handlers::run_cascade))
        // ====================================================================
        // WebSocket
        // ====================================================================
        .route("/ws/events", get(ws_handlers::ws_events))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
