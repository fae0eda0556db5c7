//! Graph event system for real-time WebSocket notifications
//!
//! This module provides:
//! - `GraphEvent`: typed events emitted after every engine operation
//! - `EventBus`: live subscriber registry that fans events out
//! - `Subscription`: the receiving end held by one subscriber

mod bus;
mod types;

pub use bus::{EventBus, Subscription};
pub use types::{EventEmitter, GraphEvent, GraphEventKind};
