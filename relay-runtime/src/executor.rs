//! Turns a [`TaskRequest`] into the single outcome a task process reports

use chrono::Utc;
use relay_core::TaskResult;
use relay_ipc::TaskRequest;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::JsExecutionError;
use crate::js_executor::execute_task_body;

/// Error reported when a task exceeds its own `timeout`
pub const TASK_TIMEOUT: &str = "task timeout";

/// Evaluate the task body synchronously.
///
/// Task-level failures (a throw, a bad body) become failed results; only a
/// runtime that cannot evaluate bodies at all is returned as `Err`.
pub fn execute_request(request: &TaskRequest) -> Result<TaskResult, JsExecutionError> {
    let job = serde_json::to_value(&request.job)
        .map_err(|e| JsExecutionError::InvalidInput(e.to_string()))?;

    let started_at = Utc::now();
    let outcome = execute_task_body(&request.task.body, &job, &request.sandbox);
    let completed_at = Utc::now();

    let result = match outcome {
        Ok(value) => TaskResult::success(value),
        Err(e) if e.is_task_error() => {
            debug!(task = %request.task.name, error = %e, "Task body failed");
            TaskResult::failure(e.to_string())
        }
        Err(e) => return Err(e),
    };

    if !request.trace {
        return Ok(result);
    }

    let trace = json!({
        "task": request.task.name,
        "task_uuid": request.task.uuid,
        "started_at": started_at.to_rfc3339(),
        "completed_at": completed_at.to_rfc3339(),
        "duration_ms": (completed_at - started_at).num_milliseconds(),
        "pid": std::process::id(),
    });
    Ok(result.with_trace(Some(trace)))
}

/// Evaluate the task body on a blocking thread, bounded by the task's own
/// `timeout` when it has one
pub async fn execute_request_bounded(request: TaskRequest) -> Result<TaskResult, JsExecutionError> {
    let limit = request.task.timeout.map(Duration::from_secs);
    let handle = tokio::task::spawn_blocking(move || execute_request(&request));

    let joined = match limit {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(timeout_secs = limit.as_secs(), "Task exceeded its timeout");
                return Ok(TaskResult::failure(TASK_TIMEOUT));
            }
        },
        None => handle.await,
    };

    joined.unwrap_or_else(|e| Ok(TaskResult::failure(format!("task panicked: {}", e))))
}

#[cfg(all(test, feature = "javascript"))]
mod tests {
    use super::*;
    use relay_core::{Job, Task};

    fn request(body: &str, trace: bool) -> TaskRequest {
        let task = Task::new("A Task", body);
        let job = Job::new(vec![task.clone()]).with_params(json!({"n": 2}));
        TaskRequest::new(task, job, json!({"base": 40}), trace)
    }

    #[test]
    fn test_success_without_trace() {
        let result = execute_request(&request(
            "function(job, sandbox) { return sandbox.base + job.params.n; }",
            false,
        ))
        .unwrap();
        assert_eq!(result, TaskResult::success(json!(42)));
    }

    #[test]
    fn test_failure_with_trace() {
        let result = execute_request(&request("function() { throw 'boom'; }", true)).unwrap();
        assert_eq!(result.error.as_deref(), Some("boom"));

        let trace = result.trace.unwrap();
        assert_eq!(trace["task"], "A Task");
        assert!(trace["duration_ms"].as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn test_task_timeout() {
        let mut request = request(
            "function() { var end = Date.now() + 3000; while (Date.now() < end) {} return 1; }",
            false,
        );
        request.task.timeout = Some(1);

        let result = execute_request_bounded(request).await.unwrap();
        assert_eq!(result.error.as_deref(), Some(TASK_TIMEOUT));
    }

    #[tokio::test]
    async fn test_bounded_success() {
        let mut request = request("function() { return 'ok'; }", false);
        request.task.timeout = Some(30);

        let result = execute_request_bounded(request).await.unwrap();
        assert_eq!(result.result, json!("ok"));
    }
}
