//! Runtime components for Relay task processes
//!
//! A task process is a short-lived child of the engine. It reads one
//! [`relay_ipc::WorkerMessage::ExecuteTask`] from stdin, evaluates the task
//! body with the job snapshot and sandbox, writes one
//! [`relay_ipc::CoordinatorMessage`] to stdout and exits.

pub mod error;
pub mod executor;
pub mod js_executor;
pub mod worker;

// Re-export commonly used types
pub use error::JsExecutionError;
pub use executor::{execute_request, execute_request_bounded, TASK_TIMEOUT};
pub use worker::{worker_main, Worker};
