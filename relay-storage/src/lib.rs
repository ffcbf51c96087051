//! Storage implementations for Relay
//!
//! Provides an in-memory [`JobBackend`](relay_interfaces::JobBackend) and
//! [`RunnerRegistry`](relay_interfaces::RunnerRegistry) for single-process
//! runs and tests. Durable backends live outside this workspace and plug in
//! through the same traits.

pub mod memory;
pub mod registry;

#[cfg(feature = "testing")]
pub mod testing;

// Re-export core types for convenience
pub use memory::MemoryJobStore;
pub use registry::{ChildEvent, MemoryRunnerRegistry};
