//! Job execution engine: the per-run state machine

use chrono::Utc;
use relay_config::ExecutionConfig;
use relay_core::{ExecutionStatus, Job, ResultProperty, QUEUED_SENTINEL};
use relay_interfaces::{JobBackend, RunnerRegistry};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::chain::{ChainOutcome, ChainRunner};
use crate::error::ExecutionError;
use crate::executor::TaskExecutor;
use crate::ledger::ResultLedger;
use crate::process::{ProcessExecutorConfig, ProcessTaskExecutor};

/// Report of one job run
#[derive(Debug, Clone)]
pub struct JobRun {
    /// The job as handed to the backend by the finalising call
    pub job: Job,
    pub status: ExecutionStatus,
    /// What drove the job off its happy path, if anything.
    /// Kept for jobs healed by their error chain.
    pub failure: Option<String>,
}

impl JobRun {
    /// Succeeded only because the error chain completed
    pub fn recovered(&self) -> bool {
        self.status == ExecutionStatus::Succeeded && self.failure.is_some()
    }
}

/// Builder for [`JobRunner`]
#[derive(Default)]
pub struct JobRunnerBuilder {
    registry: Option<Arc<dyn RunnerRegistry>>,
    backend: Option<Arc<dyn JobBackend>>,
    job: Option<Job>,
    sandbox: Option<JsonValue>,
    trace: bool,
    executor: Option<Arc<dyn TaskExecutor>>,
    process_config: Option<ProcessExecutorConfig>,
    default_timeout: Option<Duration>,
}

impl JobRunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the execution domain config: process settings, sandbox,
    /// trace flag and default job timeout
    pub fn from_config(config: &ExecutionConfig) -> Result<Self, ExecutionError> {
        Ok(Self {
            sandbox: Some(config.sandbox.clone()),
            trace: config.trace,
            process_config: Some(ProcessExecutorConfig::from_execution_config(config)?),
            default_timeout: config.default_job_timeout,
            ..Self::default()
        })
    }

    pub fn registry(mut self, registry: Arc<dyn RunnerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn JobBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn job(mut self, job: Job) -> Self {
        self.job = Some(job);
        self
    }

    pub fn sandbox(mut self, sandbox: JsonValue) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Use this executor instead of spawning task processes
    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn process_config(mut self, config: ProcessExecutorConfig) -> Self {
        self.process_config = Some(config);
        self
    }

    /// Budget for jobs without a `timeout` of their own
    pub fn default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Validate the configuration. Nothing runs until [`JobRunner::run`].
    pub fn build(self) -> Result<JobRunner, ExecutionError> {
        let registry = self.registry.ok_or_else(|| {
            ExecutionError::ConfigurationError("runner registry is required".to_string())
        })?;
        let backend = self
            .backend
            .ok_or_else(|| ExecutionError::ConfigurationError("backend is required".to_string()))?;
        let job = self
            .job
            .ok_or_else(|| ExecutionError::ConfigurationError("job is required".to_string()))?;

        let sandbox = match self.sandbox {
            None | Some(JsonValue::Null) => JsonValue::Object(serde_json::Map::new()),
            Some(sandbox @ JsonValue::Object(_)) => sandbox,
            Some(_) => {
                return Err(ExecutionError::ConfigurationError(
                    "sandbox must be an object".to_string(),
                ))
            }
        };

        let executor: Arc<dyn TaskExecutor> = match self.executor {
            Some(executor) => executor,
            None => {
                let config = match self.process_config {
                    Some(config) => config,
                    None => ProcessExecutorConfig::from_execution_config(&ExecutionConfig::default())?,
                };
                Arc::new(ProcessTaskExecutor::new(config, registry))
            }
        };

        Ok(JobRunner {
            job,
            backend,
            executor,
            sandbox,
            trace: self.trace,
            default_timeout: self.default_timeout,
        })
    }
}

/// States of a single job run
#[derive(Debug)]
enum RunState {
    Init,
    RunningMain,
    /// Entered at most once; `cause` is the main chain's failure
    RunningOnError { cause: String },
    Finalize {
        status: ExecutionStatus,
        failure: Option<String>,
    },
}

/// Drives one job to a final or requeued state
pub struct JobRunner {
    job: Job,
    backend: Arc<dyn JobBackend>,
    executor: Arc<dyn TaskExecutor>,
    sandbox: JsonValue,
    trace: bool,
    default_timeout: Option<Duration>,
}

impl JobRunner {
    pub fn builder() -> JobRunnerBuilder {
        JobRunnerBuilder::new()
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Run the job. Consumes the runner: the job belongs to this run until
    /// it is handed back in the report.
    ///
    /// Every path ends in exactly one `finish_job` or `queue_job` call.
    /// `Err` means that call itself failed or the run reached an
    /// impossible state.
    pub async fn run(self) -> Result<JobRun, ExecutionError> {
        let JobRunner {
            mut job,
            backend,
            executor,
            sandbox,
            trace,
            default_timeout,
        } = self;
        let chains = ChainRunner::new(executor.as_ref(), &sandbox, trace);
        let job_id = job.uuid;
        let mut budget = None;
        let mut state = RunState::Init;

        loop {
            state = match state {
                RunState::Init => {
                    if !job.is_due(Utc::now()) {
                        info!(%job_id, exec_after = %job.exec_after, "Job not due yet, returning to queue");
                        RunState::Finalize {
                            status: ExecutionStatus::Queued,
                            failure: None,
                        }
                    } else {
                        budget = job.timeout_duration().or(default_timeout);
                        info!(
                            %job_id,
                            tasks = job.chain.len(),
                            timeout_ms = budget.map(|b| b.as_millis() as u64),
                            "Running job"
                        );
                        RunState::RunningMain
                    }
                }

                RunState::RunningMain => {
                    let mut ledger = ResultLedger::resume(
                        job_id,
                        ResultProperty::ChainResults,
                        std::mem::take(&mut job.chain_results),
                        backend.clone(),
                    );
                    let outcome = chains.run(&job, &job.chain, &mut ledger, budget).await;
                    job.chain_results = ledger.into_results();

                    match outcome {
                        ChainOutcome::Completed => RunState::Finalize {
                            status: ExecutionStatus::Succeeded,
                            failure: None,
                        },
                        ChainOutcome::Requeued => RunState::Finalize {
                            status: ExecutionStatus::Queued,
                            failure: Some(QUEUED_SENTINEL.to_string()),
                        },
                        ChainOutcome::Aborted(e) => {
                            error!(%job_id, "Main chain aborted: {}", e);
                            RunState::Finalize {
                                status: ExecutionStatus::Failed,
                                failure: Some(e.to_string()),
                            }
                        }
                        failed => {
                            let cause = failed.failure().unwrap_or_default();
                            if job.has_error_chain() {
                                warn!(%job_id, %cause, "Main chain failed, running error chain");
                                RunState::RunningOnError { cause }
                            } else {
                                RunState::Finalize {
                                    status: ExecutionStatus::Failed,
                                    failure: Some(cause),
                                }
                            }
                        }
                    }
                }

                RunState::RunningOnError { cause } => {
                    let mut ledger = ResultLedger::resume(
                        job_id,
                        ResultProperty::OnErrorResults,
                        std::mem::take(&mut job.on_error_results),
                        backend.clone(),
                    );
                    let outcome = chains
                        .run(&job, job.error_chain(), &mut ledger, budget)
                        .await;
                    job.on_error_results = ledger.into_results();

                    match outcome {
                        ChainOutcome::Completed => {
                            info!(%job_id, %cause, "Error chain completed, job recovered");
                            RunState::Finalize {
                                status: ExecutionStatus::Succeeded,
                                failure: Some(cause),
                            }
                        }
                        ChainOutcome::Requeued => RunState::Finalize {
                            status: ExecutionStatus::Queued,
                            failure: Some(cause),
                        },
                        ChainOutcome::Aborted(e) => {
                            error!(%job_id, "Error chain aborted: {}", e);
                            RunState::Finalize {
                                status: ExecutionStatus::Failed,
                                failure: Some(e.to_string()),
                            }
                        }
                        failed => RunState::Finalize {
                            status: ExecutionStatus::Failed,
                            failure: failed.failure(),
                        },
                    }
                }

                RunState::Finalize { status, failure } => {
                    return finalize(job, status, failure, backend.as_ref()).await;
                }
            };
        }
    }
}

/// Write the resolved status and hand the job to the backend
async fn finalize(
    mut job: Job,
    status: ExecutionStatus,
    failure: Option<String>,
    backend: &dyn JobBackend,
) -> Result<JobRun, ExecutionError> {
    match status {
        ExecutionStatus::Succeeded | ExecutionStatus::Failed => {
            job.execution = status;
            backend.finish_job(&job).await?;
        }
        ExecutionStatus::Queued => {
            job.execution = status;
            backend.queue_job(&job).await?;
        }
        other => {
            return Err(ExecutionError::InvalidState(format!(
                "job {} cannot be finalized as {}",
                job.uuid, other
            )));
        }
    }

    info!(job_id = %job.uuid, %status, "Job finalized");
    Ok(JobRun {
        job,
        status,
        failure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Task;
    use relay_storage::testing::MockJobBackend;
    use relay_storage::MemoryRunnerRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn test_finalize_rejects_running() {
        let mut backend = MockJobBackend::new();
        backend.expect_finish_job().never();
        backend.expect_queue_job().never();

        let job = Job::new(vec![]);
        let err = finalize(job, ExecutionStatus::Running, None, &backend)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidState(_)));
    }

    #[test]
    fn test_build_requires_collaborators() {
        let registry = Arc::new(MemoryRunnerRegistry::new());
        let backend = Arc::new(MockJobBackend::new());

        let err = JobRunner::builder()
            .backend(backend.clone())
            .job(Job::new(vec![]))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("runner registry is required"));

        let err = JobRunner::builder()
            .registry(registry.clone())
            .job(Job::new(vec![]))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("backend is required"));

        let err = JobRunner::builder()
            .registry(registry)
            .backend(backend)
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("job is required"));
    }

    #[test]
    fn test_build_validates_sandbox() {
        let builder = || {
            JobRunner::builder()
                .registry(Arc::new(MemoryRunnerRegistry::new()))
                .backend(Arc::new(MockJobBackend::new()))
                .job(Job::new(vec![Task::new("A", "a")]))
                .process_config(ProcessExecutorConfig::new("relay", vec!["--worker".to_string()]))
        };

        assert!(matches!(
            builder().sandbox(json!("nope")).build(),
            Err(ExecutionError::ConfigurationError(_))
        ));
        assert!(builder().sandbox(JsonValue::Null).build().is_ok());

        let runner = builder().sandbox(json!({"region": "eu"})).build().unwrap();
        assert_eq!(runner.sandbox, json!({"region": "eu"}));
        assert!(!runner.trace);
    }
}
