//! Mock implementations for testing
//!
//! Use these where call counts, call order or injected failures matter;
//! use [`crate::MemoryJobStore`] where a working backend is enough.

use async_trait::async_trait;
use mockall::mock;
use relay_core::{Job, ResultProperty, TaskResult};
use relay_interfaces::{BackendResult, JobBackend, RunnerRegistry};
use uuid::Uuid;

mock! {
    pub JobBackend {}

    #[async_trait]
    impl JobBackend for JobBackend {
        async fn update_job_property(
            &self,
            job_id: Uuid,
            property: ResultProperty,
            results: &[TaskResult],
        ) -> BackendResult<()>;
        async fn finish_job(&self, job: &Job) -> BackendResult<()>;
        async fn queue_job(&self, job: &Job) -> BackendResult<()>;
    }
}

mock! {
    pub RunnerRegistry {}

    impl RunnerRegistry for RunnerRegistry {
        fn child_up(&self, job_id: Uuid, pid: u32);
        fn child_down(&self, job_id: Uuid, pid: u32);
    }
}
