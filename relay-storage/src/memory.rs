//! In-memory job store

use async_trait::async_trait;
use relay_core::{ExecutionStatus, Job, ResultProperty, TaskResult};
use relay_interfaces::{BackendError, BackendResult, JobBackend};
use std::collections::{HashMap, VecDeque};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Job records kept in process memory, with a FIFO pending queue
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    queue: Mutex<VecDeque<Uuid>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a job and put it on the pending queue
    pub async fn enqueue(&self, job: Job) {
        let job_id = job.uuid;
        self.jobs.write().await.insert(job_id, job);
        self.queue.lock().await.push_back(job_id);
    }

    /// Take the next pending job, marking the stored record as running
    pub async fn claim_next(&self) -> Option<Job> {
        let job_id = self.queue.lock().await.pop_front()?;
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id)?;
        job.execution = ExecutionStatus::Running;
        Some(job.clone())
    }

    pub async fn get(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Number of jobs waiting on the pending queue
    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    async fn store(&self, job: &Job) {
        self.jobs.write().await.insert(job.uuid, job.clone());
    }
}

#[async_trait]
impl JobBackend for MemoryJobStore {
    async fn update_job_property(
        &self,
        job_id: Uuid,
        property: ResultProperty,
        results: &[TaskResult],
    ) -> BackendResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or(BackendError::JobNotFound(job_id))?;

        *job.results_mut(property) = results.to_vec();
        debug!(%job_id, %property, entries = results.len(), "Job property updated");
        Ok(())
    }

    async fn finish_job(&self, job: &Job) -> BackendResult<()> {
        if !job.execution.is_terminal() {
            return Err(BackendError::WriteRejected {
                message: format!("cannot finish job in status {}", job.execution),
            });
        }

        self.store(job).await;
        debug!(job_id = %job.uuid, status = %job.execution, "Job finished");
        Ok(())
    }

    async fn queue_job(&self, job: &Job) -> BackendResult<()> {
        if job.execution != ExecutionStatus::Queued {
            return Err(BackendError::WriteRejected {
                message: format!("cannot queue job in status {}", job.execution),
            });
        }

        self.store(job).await;
        self.queue.lock().await.push_back(job.uuid);
        debug!(job_id = %job.uuid, "Job returned to queue");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Task;
    use serde_json::json;

    fn job() -> Job {
        Job::new(vec![Task::new("A Task", "function(job) { return 1; }")])
    }

    #[tokio::test]
    async fn test_claim_marks_running() {
        let store = MemoryJobStore::new();
        let job = job();
        let job_id = job.uuid;
        store.enqueue(job).await;
        assert_eq!(store.pending().await, 1);

        let claimed = store.claim_next().await.unwrap();
        assert_eq!(claimed.uuid, job_id);
        assert_eq!(claimed.execution, ExecutionStatus::Running);
        assert_eq!(store.pending().await, 0);
        assert!(store.claim_next().await.is_none());
    }

    #[tokio::test]
    async fn test_update_property() {
        let store = MemoryJobStore::new();
        let job = job();
        let job_id = job.uuid;
        store.enqueue(job).await;

        store
            .update_job_property(
                job_id,
                ResultProperty::OnErrorResults,
                &[TaskResult::success(json!("healed"))],
            )
            .await
            .unwrap();

        let stored = store.get(job_id).await.unwrap();
        assert!(stored.chain_results.is_empty());
        assert_eq!(stored.on_error_results.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_job() {
        let store = MemoryJobStore::new();
        let err = store
            .update_job_property(Uuid::new_v4(), ResultProperty::ChainResults, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_finish_requires_terminal_status() {
        let store = MemoryJobStore::new();
        let mut job = job();
        job.execution = ExecutionStatus::Running;
        assert!(store.finish_job(&job).await.is_err());

        job.execution = ExecutionStatus::Succeeded;
        store.finish_job(&job).await.unwrap();
        assert_eq!(
            store.get(job.uuid).await.unwrap().execution,
            ExecutionStatus::Succeeded
        );
    }

    #[tokio::test]
    async fn test_queue_job_requeues() {
        let store = MemoryJobStore::new();
        let mut job = job();
        job.chain_results.push(TaskResult::failure("queued"));

        job.execution = ExecutionStatus::Failed;
        assert!(store.queue_job(&job).await.is_err());

        job.execution = ExecutionStatus::Queued;
        store.queue_job(&job).await.unwrap();
        assert_eq!(store.pending().await, 1);

        let claimed = store.claim_next().await.unwrap();
        assert_eq!(claimed.chain_results.len(), 1);
    }
}
