//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relay", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Run as task process (internal use)
    #[arg(long, hide = true)]
    pub worker: bool,

    /// Worker ID (used with --worker)
    #[arg(long, value_name = "ID", hide = true)]
    pub worker_id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a job file through the execution engine
    Run {
        /// Path to the job JSON
        #[arg(long, value_name = "PATH")]
        job: PathBuf,

        /// JSON object handed to every task (overrides execution.sandbox)
        #[arg(long, value_name = "PATH")]
        sandbox: Option<PathBuf>,

        /// Collect per-task trace data
        #[arg(long)]
        trace: bool,

        /// Write the finalized job here instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as YAML
    SampleConfig,
}
