//! Job backend interface

use async_trait::async_trait;
use relay_core::{Job, ResultProperty, TaskResult};
use uuid::Uuid;

/// Backend error types
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Write rejected: {message}")]
    WriteRejected { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Durable store for jobs
///
/// Every call is an acknowledged write: the engine does not proceed until
/// the returned future resolves, and treats an error as a persistence
/// failure of the whole run.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Overwrite one result sequence of the job record
    async fn update_job_property(
        &self,
        job_id: Uuid,
        property: ResultProperty,
        results: &[TaskResult],
    ) -> BackendResult<()>;

    /// Mark the job complete with its final execution status (`succeeded`
    /// or `failed`), clearing any run-ownership marker
    async fn finish_job(&self, job: &Job) -> BackendResult<()>;

    /// Return the job to the pending queue, preserving its result
    /// sequences and clearing any run-ownership marker
    async fn queue_job(&self, job: &Job) -> BackendResult<()>;
}
