//! # Relay Interfaces
//!
//! Interfaces the execution engine consumes but does not implement.
//!
//! The engine owns a claimed job for the duration of a run and talks to the
//! outside world through exactly two seams:
//!
//! - [`JobBackend`] - the durable job store: per-property result updates,
//!   finishing a job and returning it to the pending queue
//! - [`RunnerRegistry`] - fleet bookkeeping of which task processes are
//!   running on behalf of which job
//!
//! How a backend claims jobs atomically, and how runners register and
//! heartbeat, is outside these interfaces.

pub mod backend;
pub mod registry;

pub use backend::{BackendError, BackendResult, JobBackend};
pub use registry::RunnerRegistry;
