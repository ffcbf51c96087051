//! Task process implementation
//!
//! One process handles exactly one task: it reads a single request, runs
//! the body in isolation from the engine and reports a single outcome.

use tracing::{debug, error, info};

use relay_ipc::{
    CoordinatorMessage, IpcError, IpcTransport, MessageEnvelope, StdioTransport, WorkerError,
    WorkerMessage,
};

use crate::executor::execute_request_bounded;

/// Task process main entry point
pub async fn worker_main(worker_id: String) -> Result<(), WorkerError> {
    info!("Starting task process: {}", worker_id);

    let mut worker = Worker::new(worker_id.clone());
    worker.run_once().await?;

    info!("Task process {} finished", worker_id);
    Ok(())
}

/// Task process state
pub struct Worker {
    worker_id: String,
    transport: StdioTransport,
}

impl Worker {
    /// Create a worker speaking over this process's stdin/stdout
    pub fn new(worker_id: String) -> Self {
        Self {
            worker_id,
            transport: StdioTransport::new(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Receive one request, answer it and close the channel
    pub async fn run_once(&mut self) -> Result<(), WorkerError> {
        let envelope = match self.receive_message().await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Failed to receive request: {}", e);
                let error = if e.is_fatal() {
                    WorkerError::MessageParseError {
                        error: e.to_string(),
                    }
                } else {
                    WorkerError::CommunicationError {
                        error: e.to_string(),
                    }
                };
                // The engine may already be gone; a failed report changes nothing
                let _ = self
                    .send_message(CoordinatorMessage::Error {
                        correlation_id: None,
                        error: error.clone(),
                    })
                    .await;
                return Err(error);
            }
        };

        let response = self.handle_message(envelope.message).await;
        self.send_message(response).await?;

        self.transport
            .close()
            .await
            .map_err(|e| WorkerError::CommunicationError {
                error: e.to_string(),
            })
    }

    /// Produce the single response for a request
    pub async fn handle_message(&self, message: WorkerMessage) -> CoordinatorMessage {
        match message {
            WorkerMessage::ExecuteTask {
                correlation_id,
                request,
            } => {
                let task_name = request.task.name.clone();
                debug!(
                    worker_id = %self.worker_id,
                    task = %task_name,
                    job_id = %request.job.uuid,
                    "Executing task"
                );

                match execute_request_bounded(request).await {
                    Ok(result) => CoordinatorMessage::task_result(correlation_id, result),
                    Err(e) => CoordinatorMessage::Error {
                        correlation_id: Some(correlation_id),
                        error: WorkerError::UnsupportedTask {
                            task: task_name,
                            error: e.to_string(),
                        },
                    },
                }
            }
        }
    }

    async fn send_message(&mut self, message: CoordinatorMessage) -> Result<(), WorkerError> {
        let envelope = MessageEnvelope::new(message);
        self.transport
            .send(&envelope)
            .await
            .map_err(|e| WorkerError::CommunicationError {
                error: e.to_string(),
            })
    }

    async fn receive_message(&mut self) -> Result<MessageEnvelope<WorkerMessage>, IpcError> {
        self.transport.receive().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{Job, Task};
    use relay_ipc::TaskRequest;
    use serde_json::json;
    use uuid::Uuid;

    fn execute(body: &str) -> (Uuid, WorkerMessage) {
        let task = Task::new("A Task", body);
        let job = Job::new(vec![task.clone()]);
        let correlation_id = Uuid::new_v4();
        let message = WorkerMessage::ExecuteTask {
            correlation_id,
            request: TaskRequest::new(task, job, json!({}), false),
        };
        (correlation_id, message)
    }

    #[tokio::test]
    async fn test_worker_creation() {
        let worker = Worker::new("test-worker".to_string());
        assert_eq!(worker.worker_id(), "test-worker");
    }

    #[cfg(feature = "javascript")]
    #[tokio::test]
    async fn test_handle_execute_task() {
        let worker = Worker::new("test-worker".to_string());
        let (correlation_id, message) = execute("function(job) { return job.chain.length; }");

        match worker.handle_message(message).await {
            CoordinatorMessage::TaskResult {
                correlation_id: received,
                result,
                error,
                trace,
            } => {
                assert_eq!(received, correlation_id);
                assert_eq!(result, json!(1));
                assert!(error.is_none());
                assert!(trace.is_none());
            }
            other => panic!("Expected TaskResult, got {:?}", other),
        }
    }

    #[cfg(feature = "javascript")]
    #[tokio::test]
    async fn test_handle_failing_task() {
        let worker = Worker::new("test-worker".to_string());
        let (_, message) = execute("function(job) { throw new Error('boom'); }");

        match worker.handle_message(message).await {
            CoordinatorMessage::TaskResult { error, .. } => {
                assert_eq!(error.as_deref(), Some("boom"));
            }
            other => panic!("Expected TaskResult, got {:?}", other),
        }
    }

    #[cfg(not(feature = "javascript"))]
    #[tokio::test]
    async fn test_handle_without_interpreter() {
        let worker = Worker::new("test-worker".to_string());
        let (correlation_id, message) = execute("function(job) { return 1; }");

        let response = worker.handle_message(message).await;
        assert_eq!(response.correlation_id(), Some(correlation_id));
        assert!(matches!(response, CoordinatorMessage::Error { .. }));
    }
}
