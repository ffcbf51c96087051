//! Error types for job execution

use relay_config::ConfigError;
use relay_interfaces::BackendError;
use thiserror::Error;

/// Engine-level execution errors
///
/// Task failures are not errors at this level: they are recorded as
/// [`relay_core::TaskResult`]s and drive the chain state machine.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Failed to spawn task process: {0}")]
    SpawnError(String),

    #[error("Backend persistence failed: {0}")]
    BackendError(#[from] BackendError),

    #[error("Invalid execution state: {0}")]
    InvalidState(String),
}

// Convert from config errors
impl From<ConfigError> for ExecutionError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigurationError(err.to_string())
    }
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
