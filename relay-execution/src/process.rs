//! Process-based task executor
//!
//! Every task runs in a freshly spawned task process that receives one
//! request and returns one response over its stdin/stdout.

use async_trait::async_trait;
use relay_config::ExecutionConfig;
use relay_core::TaskResult;
use relay_interfaces::RunnerRegistry;
use relay_ipc::{
    ChildProcessTransport, CoordinatorMessage, IpcError, IpcTransport, MessageEnvelope,
    TaskRequest, WorkerMessage,
};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::executor::TaskExecutor;

/// Error recorded when a task process ends without answering
pub const EXIT_WITHOUT_RESULT: &str = "task process exited without result";

/// Configuration for the process executor
#[derive(Debug, Clone)]
pub struct ProcessExecutorConfig {
    /// Program spawned for each task
    pub program: PathBuf,
    /// Arguments preceding `--worker-id <id>`
    pub args: Vec<String>,
    /// Time a task process may take to exit after responding
    pub exit_grace_period: Duration,
}

impl ProcessExecutorConfig {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            exit_grace_period: Duration::from_secs(5),
        }
    }

    pub fn with_exit_grace_period(mut self, grace: Duration) -> Self {
        self.exit_grace_period = grace;
        self
    }

    /// Derive the executor settings from the execution domain config.
    /// Without an explicit `worker_program` the running executable is used.
    pub fn from_execution_config(config: &ExecutionConfig) -> Result<Self, ExecutionError> {
        let program = match &config.worker_program {
            Some(program) => program.clone(),
            None => std::env::current_exe().map_err(|e| {
                ExecutionError::ConfigurationError(format!(
                    "Cannot locate task process executable: {}",
                    e
                ))
            })?,
        };

        Ok(Self {
            program,
            args: config.worker_args.clone(),
            exit_grace_period: config.exit_grace_period,
        })
    }
}

/// Process-based task executor
pub struct ProcessTaskExecutor {
    config: ProcessExecutorConfig,
    registry: Arc<dyn RunnerRegistry>,
}

impl ProcessTaskExecutor {
    pub fn new(config: ProcessExecutorConfig, registry: Arc<dyn RunnerRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &ProcessExecutorConfig {
        &self.config
    }

    fn spawn(&self, worker_id: &str) -> Result<Child, ExecutionError> {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg("--worker-id")
            .arg(worker_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        command.spawn().map_err(|e| {
            ExecutionError::SpawnError(format!("{}: {}", self.config.program.display(), e))
        })
    }

    /// One request/response round trip. Every failure here is the task's.
    async fn exchange(
        &self,
        transport: &mut ChildProcessTransport,
        correlation_id: Uuid,
        request: TaskRequest,
    ) -> TaskResult {
        let trace = request.trace;
        let message = MessageEnvelope::new(WorkerMessage::ExecuteTask {
            correlation_id,
            request,
        });

        if let Err(e) = transport.send(&message).await {
            warn!("Failed to send task to task process: {}", e);
            return if e.is_disconnect() {
                TaskResult::failure(EXIT_WITHOUT_RESULT)
            } else {
                TaskResult::failure(format!("failed to send task: {}", e))
            };
        }

        let envelope = match transport.receive::<CoordinatorMessage>().await {
            Ok(envelope) => envelope,
            Err(IpcError::ConnectionClosed) => return TaskResult::failure(EXIT_WITHOUT_RESULT),
            Err(e) => {
                warn!("Invalid response from task process: {}", e);
                return TaskResult::failure(format!("task process protocol error: {}", e));
            }
        };

        if trace {
            info!(response = ?envelope.message, "Got a message from task process");
        } else {
            debug!(response = ?envelope.message, "Got a message from task process");
        }

        match envelope.message {
            CoordinatorMessage::TaskResult {
                correlation_id: received,
                ..
            } if received != correlation_id => TaskResult::failure(format!(
                "task process answered unknown request {}",
                received
            )),
            CoordinatorMessage::TaskResult {
                result,
                error,
                trace: task_trace,
                ..
            } => TaskResult {
                result,
                error,
                trace: if trace { task_trace } else { None },
            },
            CoordinatorMessage::Error { error, .. } => TaskResult::failure(error.to_string()),
        }
    }
}

#[async_trait]
impl TaskExecutor for ProcessTaskExecutor {
    async fn execute(&self, request: TaskRequest) -> Result<TaskResult, ExecutionError> {
        let job_id = request.job.uuid;
        let task_name = request.task.name.clone();
        let worker_id = Uuid::new_v4().to_string();

        let mut child = self.spawn(&worker_id)?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let guard = ChildGuard::new(
            child,
            job_id,
            self.registry.clone(),
            self.config.exit_grace_period,
        );
        info!(%job_id, task = %task_name, pid = guard.pid(), "Task process started");

        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            return Ok(TaskResult::failure("task process pipes unavailable"));
        };

        let mut transport = ChildProcessTransport::new(stdin, stdout);
        let outcome = self
            .exchange(&mut transport, Uuid::new_v4(), request)
            .await;

        if let Err(e) = transport.close().await {
            debug!("Closing task process pipes: {}", e);
        }
        // The result is final once received; the exit is awaited off the dispatch path
        guard.release();

        Ok(outcome)
    }
}

/// A task process together with its registry entry
struct TrackedChild {
    child: Child,
    job_id: Uuid,
    pid: u32,
    registry: Arc<dyn RunnerRegistry>,
}

impl TrackedChild {
    /// Wait for the process to exit, killing it once `grace` has passed,
    /// then unregister it.
    async fn reap(mut self, grace: Duration) {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!(pid = self.pid, %status, "Task process exited"),
            Ok(Err(e)) => warn!(pid = self.pid, "Failed to wait for task process: {}", e),
            Err(_) => {
                warn!(pid = self.pid, "Task process still running after grace period, killing");
                if let Err(e) = self.child.kill().await {
                    warn!(pid = self.pid, "Failed to kill task process: {}", e);
                }
            }
        }
        self.registry.child_down(self.job_id, self.pid);
    }
}

/// Owns a running task process and its registry entry.
///
/// Registers the child on creation. The child is unregistered only after it
/// has exited: [`ChildGuard::release`] hands it to a background reaper, and
/// dropping the guard (an abandoned dispatch) kills it before reaping.
struct ChildGuard {
    tracked: Option<TrackedChild>,
    grace: Duration,
}

impl ChildGuard {
    fn new(
        child: Child,
        job_id: Uuid,
        registry: Arc<dyn RunnerRegistry>,
        grace: Duration,
    ) -> Self {
        let pid = child.id().unwrap_or_default();
        registry.child_up(job_id, pid);
        Self {
            tracked: Some(TrackedChild {
                child,
                job_id,
                pid,
                registry,
            }),
            grace,
        }
    }

    fn pid(&self) -> u32 {
        self.tracked.as_ref().map(|t| t.pid).unwrap_or_default()
    }

    /// Let the process finish on its own within the grace period
    fn release(mut self) {
        if let Some(tracked) = self.tracked.take() {
            tokio::spawn(tracked.reap(self.grace));
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(mut tracked) = self.tracked.take() else {
            return;
        };

        if let Ok(None) = tracked.child.try_wait() {
            debug!(pid = tracked.pid, "Terminating task process");
            let _ = tracked.child.start_kill();
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(tracked.reap(self.grace));
            }
            // No runtime left to wait on; kill_on_drop still signals the child
            Err(_) => tracked.registry.child_down(tracked.job_id, tracked.pid),
        }
    }
}
