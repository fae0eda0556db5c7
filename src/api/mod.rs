//! HTTP and WebSocket API for the graph engine

pub mod handlers;
pub mod routes;
pub mod ws_handlers;

pub use handlers::{AppError, EngineState, ServerState};
pub use routes::create_router;
