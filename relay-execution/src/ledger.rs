//! Append-only result sequence of one chain, mirrored to the backend

use relay_core::{Job, ResultProperty, TaskResult};
use relay_interfaces::{BackendResult, JobBackend};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Result sequence for either the main chain or the error chain.
///
/// Entries are only ever appended. [`ResultLedger::record`] appends and
/// persists the whole sequence before returning, so a crash loses at most
/// the task that was in flight.
pub struct ResultLedger {
    job_id: Uuid,
    property: ResultProperty,
    results: Vec<TaskResult>,
    backend: Arc<dyn JobBackend>,
}

impl ResultLedger {
    pub fn new(job_id: Uuid, property: ResultProperty, backend: Arc<dyn JobBackend>) -> Self {
        Self::resume(job_id, property, Vec::new(), backend)
    }

    /// Continue a sequence carried over from an earlier run.
    ///
    /// A trailing requeue marker is dropped: it stands for the task that
    /// asked to be re-run, and that task's next result takes its place.
    pub fn resume(
        job_id: Uuid,
        property: ResultProperty,
        mut results: Vec<TaskResult>,
        backend: Arc<dyn JobBackend>,
    ) -> Self {
        if results.last().is_some_and(TaskResult::is_requeue) {
            results.pop();
            debug!(%job_id, %property, "Resuming after requeue marker");
        }

        Self {
            job_id,
            property,
            results,
            backend,
        }
    }

    pub fn append(&mut self, result: TaskResult) {
        self.results.push(result);
    }

    /// Overwrite the backend copy with the full current sequence
    pub async fn persist(&self) -> BackendResult<()> {
        debug!(
            job_id = %self.job_id,
            property = %self.property,
            entries = self.results.len(),
            "Persisting results"
        );
        self.backend
            .update_job_property(self.job_id, self.property, &self.results)
            .await
    }

    /// Append then persist
    pub async fn record(&mut self, result: TaskResult) -> BackendResult<()> {
        self.append(result);
        self.persist().await
    }

    pub fn property(&self) -> ResultProperty {
        self.property
    }

    pub fn last(&self) -> Option<&TaskResult> {
        self.results.last()
    }

    /// Index of the first task of the chain that has no result yet
    pub fn resume_point(&self) -> usize {
        self.results.len()
    }

    /// The job as a task sees it: `job` with this ledger's results in place
    pub fn snapshot_of(&self, job: &Job) -> Job {
        let mut snapshot = job.clone();
        *snapshot.results_mut(self.property) = self.results.clone();
        snapshot
    }

    pub fn into_results(self) -> Vec<TaskResult> {
        self.results
    }
}
