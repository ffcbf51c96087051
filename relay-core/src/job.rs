//! Job domain model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::RelayError;
use crate::task::{Task, TaskResult};

/// Job execution status
///
/// `Queued` is re-entrant: a requeued job goes back to the backend queue
/// with its accumulated results and is picked up again later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl ExecutionStatus {
    /// Check if the status ends the job for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Succeeded | ExecutionStatus::Failed)
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(ExecutionStatus::Queued),
            "running" => Ok(ExecutionStatus::Running),
            "succeeded" => Ok(ExecutionStatus::Succeeded),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(RelayError::UnknownStatus(other.to_string())),
        }
    }
}

/// Names one of the two result sequences held by a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultProperty {
    /// Results of the main chain
    ChainResults,
    /// Results of the error-recovery chain
    #[serde(rename = "onerror_results")]
    OnErrorResults,
}

impl ResultProperty {
    /// The field name used on the job record
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultProperty::ChainResults => "chain_results",
            ResultProperty::OnErrorResults => "onerror_results",
        }
    }
}

impl fmt::Display for ResultProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An instantiated workflow run: a chain of tasks, an optional error chain
/// and the results accumulated so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub chain: Vec<Task>,

    /// Append-only, in chain order
    #[serde(default)]
    pub chain_results: Vec<TaskResult>,

    #[serde(default, rename = "onerror", skip_serializing_if = "Option::is_none")]
    pub on_error: Option<Vec<Task>>,

    /// Append-only, written only while the error chain runs
    #[serde(default, rename = "onerror_results")]
    pub on_error_results: Vec<TaskResult>,

    /// Earliest moment the job may start
    #[serde(default = "Utc::now")]
    pub exec_after: DateTime<Utc>,

    /// Budget for one chain pass, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub execution: ExecutionStatus,

    #[serde(default)]
    pub params: JsonValue,
}

impl Job {
    /// Create a queued job for the given chain
    pub fn new(chain: Vec<Task>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: None,
            chain,
            chain_results: Vec::new(),
            on_error: None,
            on_error_results: Vec::new(),
            exec_after: Utc::now(),
            timeout: None,
            execution: ExecutionStatus::Queued,
            params: JsonValue::Null,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_on_error(mut self, on_error: Vec<Task>) -> Self {
        self.on_error = Some(on_error);
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn with_exec_after(mut self, exec_after: DateTime<Utc>) -> Self {
        self.exec_after = exec_after;
        self
    }

    pub fn with_params(mut self, params: JsonValue) -> Self {
        self.params = params;
        self
    }

    /// Whether a non-empty error-recovery chain is configured
    pub fn has_error_chain(&self) -> bool {
        self.on_error.as_ref().is_some_and(|chain| !chain.is_empty())
    }

    /// Tasks of the error chain, empty when none is configured
    pub fn error_chain(&self) -> &[Task] {
        self.on_error.as_deref().unwrap_or_default()
    }

    /// The chain-level budget derived from `timeout`
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
            .map(|seconds| Duration::from_millis(seconds.saturating_mul(1000)))
    }

    /// Whether `exec_after` has been reached
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.exec_after <= now
    }

    pub fn results(&self, property: ResultProperty) -> &[TaskResult] {
        match property {
            ResultProperty::ChainResults => &self.chain_results,
            ResultProperty::OnErrorResults => &self.on_error_results,
        }
    }

    pub fn results_mut(&mut self, property: ResultProperty) -> &mut Vec<TaskResult> {
        match property {
            ResultProperty::ChainResults => &mut self.chain_results,
            ResultProperty::OnErrorResults => &mut self.on_error_results,
        }
    }
}
