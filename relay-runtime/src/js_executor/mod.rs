//! JavaScript execution engine for task bodies

#[cfg(feature = "javascript")]
pub mod conversion;
#[cfg(feature = "javascript")]
pub mod execution;

#[cfg(feature = "javascript")]
pub use execution::execute_task_body;

/// Execute a task body (unavailable without the javascript feature)
#[cfg(not(feature = "javascript"))]
pub fn execute_task_body(
    _body: &str,
    _job: &serde_json::Value,
    _sandbox: &serde_json::Value,
) -> Result<serde_json::Value, crate::error::JsExecutionError> {
    Err(crate::error::JsExecutionError::FeatureDisabled)
}
