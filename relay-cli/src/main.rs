use anyhow::{Context, Result};
use clap::Parser;
use relay_config::{ConfigLoader, RelayConfig};
use relay_core::Job;
use relay_execution::JobRunnerBuilder;
use relay_storage::{MemoryJobStore, MemoryRunnerRegistry};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

mod cli;
mod logging;

use cli::{Cli, Commands};
use logging::{init_logging, init_worker_tracing};

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<RelayConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => loader
            .from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

/// Run one job file with an in-memory backend and print the finalized job
async fn run_job(
    config: &RelayConfig,
    job_path: &Path,
    sandbox_path: Option<&PathBuf>,
    trace: bool,
    output: Option<&PathBuf>,
) -> Result<()> {
    let job: Job = serde_json::from_value(read_json(job_path)?)
        .with_context(|| format!("Invalid job in {:?}", job_path))?;
    let sandbox = match sandbox_path {
        Some(path) => read_json(path)?,
        None => config.execution.sandbox.clone(),
    };

    let store = Arc::new(MemoryJobStore::new());
    store.enqueue(job).await;
    let job = store
        .claim_next()
        .await
        .context("Job vanished from the in-memory queue")?;
    info!(job_id = %job.uuid, "Running job from {:?}", job_path);

    let run = JobRunnerBuilder::from_config(&config.execution)?
        .registry(Arc::new(MemoryRunnerRegistry::new()))
        .backend(store)
        .job(job)
        .sandbox(sandbox)
        .trace(trace || config.execution.trace)
        .build()?
        .run()
        .await
        .context("Job run failed")?;

    match &run.failure {
        Some(failure) if run.recovered() => {
            info!(status = %run.status, %failure, "Job recovered by its error chain")
        }
        Some(failure) => info!(status = %run.status, %failure, "Job finished"),
        None => info!(status = %run.status, "Job finished"),
    }

    let report =
        serde_json::to_string_pretty(&run.job).context("Failed to format job as JSON")?;
    match output {
        Some(path) => {
            std::fs::write(path, report).with_context(|| format!("Failed to write {:?}", path))?;
            debug!("Job written to {:?}", path);
        }
        None => println!("{}", report),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Worker mode: stdout is the IPC channel, nothing else may write to it
    if cli.worker {
        init_worker_tracing(cli.log_level.as_deref())?;
        let worker_id = cli.worker_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let code = match relay_runtime::worker_main(worker_id).await {
            Ok(()) => 0,
            Err(e) => {
                error!("Task process failed: {}", e);
                1
            }
        };
        // A timed-out task body may still hold a blocking thread
        std::process::exit(code);
    }

    let config = load_config(cli.config.as_ref())?;
    init_logging(&config.logging, cli.log_level.as_deref())?;

    match &cli.command {
        Some(Commands::Run {
            job,
            sandbox,
            trace,
            output,
        }) => run_job(&config, job, sandbox.as_ref(), *trace, output.as_ref()).await,
        Some(Commands::SampleConfig) => {
            print!("{}", RelayConfig::generate_sample());
            Ok(())
        }
        None => {
            println!("No command specified. Use --help to see available commands.");
            Ok(())
        }
    }
}
