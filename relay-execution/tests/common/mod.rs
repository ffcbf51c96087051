//! Shared fixtures for engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use relay_core::{Job, Task, TaskResult};
use relay_execution::{ExecutionError, TaskExecutor};
use relay_ipc::TaskRequest;
use relay_storage::MemoryJobStore;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted task does when dispatched
#[derive(Debug, Clone)]
pub enum Step {
    Succeed(JsonValue),
    /// Succeed after this much (tokio) time
    Delay(Duration, JsonValue),
    Fail(&'static str),
    /// Never answers
    Hang,
    /// Infrastructure failure, as when the task process cannot start
    Abort,
}

/// One observed dispatch
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub task: String,
    pub chain_results: usize,
    pub on_error_results: usize,
    pub sandbox: JsonValue,
    pub trace: bool,
}

/// Executor whose tasks behave according to a script keyed by task name
#[derive(Default)]
pub struct ScriptedExecutor {
    steps: HashMap<String, Step>,
    dispatched: Mutex<Vec<Dispatch>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, task: &str, step: Step) -> Self {
        self.steps.insert(task.to_string(), step);
        self
    }

    pub fn dispatched(&self) -> Vec<Dispatch> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn dispatched_names(&self) -> Vec<String> {
        self.dispatched().into_iter().map(|d| d.task).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(&self, request: TaskRequest) -> Result<TaskResult, ExecutionError> {
        self.dispatched.lock().unwrap().push(Dispatch {
            task: request.task.name.clone(),
            chain_results: request.job.chain_results.len(),
            on_error_results: request.job.on_error_results.len(),
            sandbox: request.sandbox.clone(),
            trace: request.trace,
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let trace = Some(json!({ "task": request.task.name }));
        let step = self
            .steps
            .get(&request.task.name)
            .cloned()
            .unwrap_or(Step::Succeed(JsonValue::Null));

        match step {
            Step::Succeed(value) => Ok(TaskResult::success(value).with_trace(trace)),
            Step::Delay(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(TaskResult::success(value).with_trace(trace))
            }
            Step::Fail(error) => Ok(TaskResult::failure(error).with_trace(trace)),
            Step::Hang => std::future::pending().await,
            Step::Abort => Err(ExecutionError::SpawnError(
                "/nonexistent/worker: No such file or directory".to_string(),
            )),
        }
    }
}

pub fn task(name: &str) -> Task {
    Task::new(name, format!("function(job) {{ return '{}'; }}", name))
}

pub fn tasks(names: &[&str]) -> Vec<Task> {
    names.iter().map(|name| task(name)).collect()
}

/// A store holding `job`, as if it had just been claimed
pub async fn store_with(job: &Job) -> Arc<MemoryJobStore> {
    let store = Arc::new(MemoryJobStore::new());
    store.enqueue(job.clone()).await;
    store.claim_next().await;
    store
}
