//! Runner registry interface

use uuid::Uuid;

/// Tracks which task processes are executing on behalf of which job
///
/// Used by the hosting fleet for liveness and cleanup accounting. Calls are
/// fire-and-forget notifications and carry no task outcome.
pub trait RunnerRegistry: Send + Sync {
    /// A task process was spawned for `job_id`
    fn child_up(&self, job_id: Uuid, pid: u32);

    /// The task process `pid` of `job_id` has terminated or been abandoned
    fn child_down(&self, job_id: Uuid, pid: u32);
}
