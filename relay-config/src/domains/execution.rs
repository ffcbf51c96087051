//! Job execution configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::time::Duration;

/// Job execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Program spawned for every task. `None` means the running executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_program: Option<PathBuf>,

    /// Arguments passed to the task process
    #[serde(default = "default_worker_args")]
    pub worker_args: Vec<String>,

    /// Chain budget for jobs that carry no `timeout` of their own
    #[serde(
        with = "crate::domains::utils::serde_duration_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_job_timeout: Option<Duration>,

    /// How long a task process may linger after its response before it is killed
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_exit_grace_period"
    )]
    pub exit_grace_period: Duration,

    /// Ask task processes for diagnostic traces
    #[serde(default = "crate::domains::utils::default_false")]
    pub trace: bool,

    /// Object handed to every task alongside the job snapshot
    #[serde(default = "default_sandbox")]
    pub sandbox: JsonValue,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            worker_program: None,
            worker_args: default_worker_args(),
            default_job_timeout: None,
            exit_grace_period: default_exit_grace_period(),
            trace: false,
            sandbox: default_sandbox(),
        }
    }
}

impl Validatable for ExecutionConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(program) = &self.worker_program {
            validate_required_string(
                &program.to_string_lossy(),
                "worker_program",
                self.domain_name(),
            )?;
        }

        if let Some(timeout) = self.default_job_timeout {
            validate_positive(timeout.as_secs(), "default_job_timeout", self.domain_name())?;
        }

        validate_positive(
            self.exit_grace_period.as_secs(),
            "exit_grace_period",
            self.domain_name(),
        )?;

        if !self.sandbox.is_object() {
            return Err(self.validation_error("sandbox must be a JSON object"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "execution"
    }
}

// Default value functions
fn default_worker_args() -> Vec<String> {
    vec!["--worker".to_string()]
}

fn default_exit_grace_period() -> Duration {
    Duration::from_secs(5)
}

fn default_sandbox() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}
