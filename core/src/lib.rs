#![deny(missing_docs)]
//! cohost_core: shared building blocks (config, KV, memory, logging, job and event types).

/// Configuration helpers (AppId, dirs, load_or_init, etc.)
pub mod cfg;
/// Error taxonomy shared by the gateway, generation, speech and job layers.
pub mod error;
/// Shared job model used by the scheduler and the status server.
pub mod job;
/// Tracing/log initialization helpers.
pub mod logx;
/// Agent long-term memory layered on the KV store.
pub mod memory;
/// Viewer events and outbound records exchanged with the data gateway.
pub mod model;
/// Simple file-backed KV store with serde helpers.
pub mod store;
