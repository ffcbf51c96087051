//! IPC protocol definitions and message types

use chrono::{DateTime, Utc};
use relay_core::{Job, Task, TaskResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// IPC protocol version for compatibility checking
pub const IPC_PROTOCOL_VERSION: u32 = 1;

/// The work handed to a task process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: Task,
    /// Snapshot of the job as it stood when the task was dispatched
    pub job: Job,
    #[serde(default)]
    pub sandbox: JsonValue,
    #[serde(default)]
    pub trace: bool,
}

impl TaskRequest {
    pub fn new(task: Task, job: Job, sandbox: JsonValue, trace: bool) -> Self {
        Self {
            task,
            job,
            sandbox,
            trace,
        }
    }
}

/// Messages sent from the engine to a task process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Execute a task
    ExecuteTask {
        correlation_id: Uuid,
        request: TaskRequest,
    },
}

/// Messages sent from a task process back to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorMessage {
    /// Outcome of the task body
    TaskResult {
        correlation_id: Uuid,
        #[serde(default)]
        result: JsonValue,
        #[serde(default)]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trace: Option<JsonValue>,
    },

    /// The worker could not run the task at all
    Error {
        correlation_id: Option<Uuid>,
        error: WorkerError,
    },
}

impl CoordinatorMessage {
    /// Build a task result message from a [`TaskResult`]
    pub fn task_result(correlation_id: Uuid, outcome: TaskResult) -> Self {
        CoordinatorMessage::TaskResult {
            correlation_id,
            result: outcome.result,
            error: outcome.error,
            trace: outcome.trace,
        }
    }

    pub fn correlation_id(&self) -> Option<Uuid> {
        match self {
            CoordinatorMessage::TaskResult { correlation_id, .. } => Some(*correlation_id),
            CoordinatorMessage::Error { correlation_id, .. } => *correlation_id,
        }
    }
}

/// Worker error types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum WorkerError {
    /// Worker initialization failed
    InitializationFailed { error: String },

    /// Communication error
    CommunicationError { error: String },

    /// The task body could not be evaluated by this worker
    UnsupportedTask { task: String, error: String },

    /// Message parse error
    MessageParseError { error: String },
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::InitializationFailed { error } => {
                write!(f, "Worker initialization failed: {}", error)
            }
            WorkerError::CommunicationError { error } => {
                write!(f, "Communication error: {}", error)
            }
            WorkerError::UnsupportedTask { task, error } => {
                write!(f, "Task '{}' cannot be executed: {}", task, error)
            }
            WorkerError::MessageParseError { error } => {
                write!(f, "Message parse error: {}", error)
            }
        }
    }
}

impl std::error::Error for WorkerError {}

/// Message envelope for all IPC communications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub protocol_version: u32,
    pub timestamp: DateTime<Utc>,
    pub message: T,
}

impl<T> MessageEnvelope<T> {
    /// Create a new message envelope
    pub fn new(message: T) -> Self {
        Self {
            protocol_version: IPC_PROTOCOL_VERSION,
            timestamp: Utc::now(),
            message,
        }
    }

    /// Check if protocol version is compatible
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == IPC_PROTOCOL_VERSION
    }
}
