//! Runtime error types

use thiserror::Error;

/// JavaScript execution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsExecutionError {
    /// The body could not be parsed
    #[error("Compile error: {0}")]
    CompileError(String),

    /// The body neither evaluates to a function nor defines `main`
    #[error("Task body does not define a callable entry point")]
    NotCallable,

    /// The task threw; carries the thrown message
    #[error("{0}")]
    Thrown(String),

    /// The returned value could not be represented as JSON
    #[error("Invalid output format: {0}")]
    InvalidOutputFormat(String),

    /// Inputs could not be handed to the interpreter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Built without the `javascript` feature
    #[error("JavaScript feature not enabled")]
    FeatureDisabled,
}

impl JsExecutionError {
    /// Errors that describe the task's own outcome rather than the runtime
    pub fn is_task_error(&self) -> bool {
        !matches!(self, JsExecutionError::FeatureDisabled)
    }
}
