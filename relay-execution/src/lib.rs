//! Job execution engine for Relay
//!
//! This crate drives one claimed job to completion:
//!
//! - [`ProcessTaskExecutor`] runs each task in its own task process
//! - [`ResultLedger`] keeps a chain's results and persists them after every task
//! - [`ChainRunner`] executes a chain sequentially under one timeout budget
//! - [`JobRunner`] escalates failures to the error chain and finalizes the job

pub mod chain;
pub mod engine;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod process;

// Re-export main types
pub use chain::{ChainOutcome, ChainRunner};
pub use engine::{JobRun, JobRunner, JobRunnerBuilder};
pub use error::{ExecutionError, ExecutionResult};
pub use executor::TaskExecutor;
pub use ledger::ResultLedger;
pub use process::{ProcessExecutorConfig, ProcessTaskExecutor, EXIT_WITHOUT_RESULT};
