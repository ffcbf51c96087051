//! Sequential chain execution under one timeout budget

use relay_core::{Job, Task, TaskResult, WORKFLOW_TIMEOUT};
use relay_ipc::TaskRequest;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ExecutionError;
use crate::executor::TaskExecutor;
use crate::ledger::ResultLedger;

/// How a chain settled
#[derive(Debug)]
pub enum ChainOutcome {
    /// Every task produced a successful result
    Completed,
    /// A task reported this error; later tasks were not dispatched
    TaskFailed(String),
    /// The budget ran out; a timeout entry was recorded
    TimedOut,
    /// A task asked for the job to go back to the queue
    Requeued,
    /// Persistence or infrastructure failure; the run must stop
    Aborted(ExecutionError),
}

impl ChainOutcome {
    /// The failure text this outcome contributes to the run report
    pub fn failure(&self) -> Option<String> {
        match self {
            ChainOutcome::Completed | ChainOutcome::Requeued => None,
            ChainOutcome::TaskFailed(error) => Some(error.clone()),
            ChainOutcome::TimedOut => Some(WORKFLOW_TIMEOUT.to_string()),
            ChainOutcome::Aborted(e) => Some(e.to_string()),
        }
    }
}

/// Dispatches the tasks of one chain, one at a time
pub struct ChainRunner<'a> {
    executor: &'a dyn TaskExecutor,
    sandbox: &'a JsonValue,
    trace: bool,
}

impl<'a> ChainRunner<'a> {
    pub fn new(executor: &'a dyn TaskExecutor, sandbox: &'a JsonValue, trace: bool) -> Self {
        Self {
            executor,
            sandbox,
            trace,
        }
    }

    /// Run `tasks` from the ledger's resume point.
    ///
    /// Task *i+1* is dispatched only after the result of task *i* has been
    /// recorded. When `budget` elapses the in-flight dispatch is dropped,
    /// which terminates its task process, and a timeout entry is recorded
    /// in its place.
    pub async fn run(
        &self,
        job: &Job,
        tasks: &[Task],
        ledger: &mut ResultLedger,
        budget: Option<Duration>,
    ) -> ChainOutcome {
        // A budget past the clock's range never elapses
        let deadline = budget.and_then(|budget| Instant::now().checked_add(budget));

        if let Some(last) = ledger.last().filter(|last| last.is_error()) {
            debug!(job_id = %job.uuid, property = %ledger.property(), "Chain already settled as failed");
            return if last.is_workflow_timeout() {
                ChainOutcome::TimedOut
            } else {
                ChainOutcome::TaskFailed(last.error.clone().unwrap_or_default())
            };
        }

        for task in tasks.iter().skip(ledger.resume_point()) {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return self.time_out(job, ledger).await;
            }

            debug!(job_id = %job.uuid, task = %task.name, "Dispatching task");
            let request = TaskRequest::new(
                task.clone(),
                ledger.snapshot_of(job),
                self.sandbox.clone(),
                self.trace,
            );
            let dispatch = self.executor.execute(request);

            let dispatched = match deadline {
                Some(deadline) => tokio::select! {
                    biased;
                    _ = tokio::time::sleep_until(deadline) => {
                        warn!(job_id = %job.uuid, task = %task.name, "Chain timed out during task");
                        return self.time_out(job, ledger).await;
                    }
                    dispatched = dispatch => dispatched,
                },
                None => dispatch.await,
            };

            let mut result = match dispatched {
                Ok(result) => result,
                Err(e) => return ChainOutcome::Aborted(e),
            };
            if !self.trace {
                result.trace = None;
            }

            let requeue = result.is_requeue();
            let error = result.error.clone();
            if let Err(e) = ledger.record(result).await {
                return ChainOutcome::Aborted(e.into());
            }

            if requeue {
                info!(job_id = %job.uuid, task = %task.name, "Task requested requeue");
                return ChainOutcome::Requeued;
            }
            if let Some(error) = error {
                info!(job_id = %job.uuid, task = %task.name, %error, "Task failed");
                return ChainOutcome::TaskFailed(error);
            }
        }

        ChainOutcome::Completed
    }

    async fn time_out(&self, job: &Job, ledger: &mut ResultLedger) -> ChainOutcome {
        info!(job_id = %job.uuid, property = %ledger.property(), "Workflow timeout");
        match ledger.record(TaskResult::workflow_timeout()).await {
            Ok(()) => ChainOutcome::TimedOut,
            Err(e) => ChainOutcome::Aborted(e.into()),
        }
    }
}
