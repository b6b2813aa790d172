pub mod ask;
pub mod schema;
pub mod status;

use crate::config::Provider;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "council")]
#[command(
    author,
    version,
    about = "Ask several models, let them peer-review each other anonymously, and have a chairman synthesize one answer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Put a question to the council
    Ask(AskArgs),

    /// Check that the configured backend is installed and authenticated
    Status(StatusArgs),

    /// Print JSON Schema for config validation
    Schema(SchemaArgs),
}

#[derive(Parser, Clone)]
pub struct AskArgs {
    /// The question; prompted for interactively when omitted
    pub question: Vec<String>,

    /// Path to config file (defaults to council.yaml when present)
    #[arg(short, long, env = "COUNCIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override council models (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub council: Option<Vec<String>>,

    /// Override the chairman model
    #[arg(long)]
    pub chairman: Option<String>,

    /// Override the per-invocation timeout for stages 1 and 2, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Override the backend (cursor-agent, claude, codex)
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Print the run summary as JSON instead of the console report
    #[arg(long)]
    pub json: bool,

    /// Also write <run-id>.md and <run-id>.json into this directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Skip the backend readiness check
    #[arg(long)]
    pub skip_check: bool,

    /// Show plan without executing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone)]
pub struct StatusArgs {
    /// Path to config file (defaults to council.yaml when present)
    #[arg(short, long, env = "COUNCIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the backend (cursor-agent, claude, codex)
    #[arg(long)]
    pub provider: Option<Provider>,
}

#[derive(Parser, Clone)]
pub struct SchemaArgs {
    /// Write the schema to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
