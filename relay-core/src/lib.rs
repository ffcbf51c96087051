//! Core domain models and types for Relay
//!
//! This crate contains the job and task model shared by the execution
//! engine, the task worker process and the backend interfaces. It has
//! minimal dependencies and defines the domain language of the runner.

pub mod error;
pub mod job;
pub mod task;

// Re-export commonly used types at the crate root
pub use error::RelayError;
pub use job::{ExecutionStatus, Job, ResultProperty};
pub use task::{Task, TaskResult, QUEUED_SENTINEL, WORKFLOW_TIMEOUT};
