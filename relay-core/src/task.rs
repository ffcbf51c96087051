//! Task definitions and the results they produce

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Error value a task reports to ask for its job to be re-queued
pub const QUEUED_SENTINEL: &str = "queued";

/// Error value recorded when a chain exceeds its timeout budget
pub const WORKFLOW_TIMEOUT: &str = "workflow timeout";

/// A unit of work executed in an isolated task process
///
/// `body` is the JavaScript source of the task procedure. It evaluates to a
/// function (or defines a global `main`) called with the job snapshot and
/// the sandbox object; its return value becomes the task result and a
/// thrown value becomes the task error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,

    pub name: String,

    pub body: String,

    /// Task-local timeout in seconds. Enforced by the task process, not by
    /// the chain-level timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Retry count assigned by the workflow factory; carried, never consumed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
}

impl Task {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            body: body.into(),
            timeout: None,
            retry: None,
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Outcome of a single task, as stored in a job's result sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub result: JsonValue,

    /// `None` on success, the failure description otherwise.
    /// The literal [`QUEUED_SENTINEL`] is a requeue request, not a failure.
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<JsonValue>,
}

impl TaskResult {
    /// Create a successful result
    pub fn success(result: JsonValue) -> Self {
        Self {
            result,
            error: None,
            trace: None,
        }
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            result: JsonValue::Null,
            error: Some(error.into()),
            trace: None,
        }
    }

    /// The synthetic entry appended when a chain runs out of time
    pub fn workflow_timeout() -> Self {
        Self {
            result: JsonValue::String(String::new()),
            error: Some(WORKFLOW_TIMEOUT.to_string()),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: Option<JsonValue>) -> Self {
        self.trace = trace;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// True when the task asked for the job to go back to the queue
    pub fn is_requeue(&self) -> bool {
        self.error.as_deref() == Some(QUEUED_SENTINEL)
    }

    pub fn is_workflow_timeout(&self) -> bool {
        self.error.as_deref() == Some(WORKFLOW_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_builder() {
        let task = Task::new("fetch", "function(job) { return 1; }")
            .with_timeout(30)
            .with_retry(3);

        assert_eq!(task.name, "fetch");
        assert_eq!(task.timeout, Some(30));
        assert_eq!(task.retry, Some(3));
    }

    #[test]
    fn test_task_deserializes_without_optional_fields() {
        let task: Task = serde_json::from_value(json!({
            "name": "A Task",
            "body": "function(job) { return null; }"
        }))
        .unwrap();

        assert_eq!(task.name, "A Task");
        assert!(task.timeout.is_none());
        assert!(task.retry.is_none());
    }

    #[test]
    fn test_workflow_timeout_result() {
        let result = TaskResult::workflow_timeout();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"result": "", "error": "workflow timeout"})
        );
        assert!(result.is_workflow_timeout());
        assert!(!result.is_requeue());
    }

    #[test]
    fn test_requeue_sentinel() {
        assert!(TaskResult::failure("queued").is_requeue());
        assert!(!TaskResult::failure("queued later").is_requeue());
        assert!(!TaskResult::success(json!("queued")).is_requeue());
    }

    #[test]
    fn test_success_serializes_null_error() {
        let result = TaskResult::success(json!({"count": 2}));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["error"], JsonValue::Null);
        assert!(value.get("trace").is_none());
    }
}
