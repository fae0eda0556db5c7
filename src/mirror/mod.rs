//! Durable mirror of the in-memory graph.
//!
//! The engine keeps the authoritative graph in memory; every mutation is
//! also written through a [`GraphMirror`] before its event is broadcast.
//! Mirroring is best-effort: failures are logged, never surfaced.

mod memory;
mod sled_store;
pub mod traits;

pub use memory::MemoryMirror;
pub use sled_store::SledMirror;
pub use traits::GraphMirror;
