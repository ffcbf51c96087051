//! Core executor trait

use async_trait::async_trait;
use relay_core::TaskResult;
use relay_ipc::TaskRequest;

use crate::error::ExecutionError;

/// Runs one task to its single outcome.
///
/// A task that fails, crashes or misbehaves yields `Ok` with an error
/// result. `Err` is reserved for infrastructure failures, such as a task
/// process that cannot be started, which abort the whole run.
///
/// Dropping the returned future must abandon the task: implementations
/// terminate whatever is executing it, so no result is produced later.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, request: TaskRequest) -> Result<TaskResult, ExecutionError>;
}
