use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod config;
mod council;
mod error;
mod output;
mod provider;
mod runner;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing - only show logs with --verbose
    let filter = if cli.verbose {
        EnvFilter::new("council=debug")
    } else {
        EnvFilter::new("council=warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask(args) => cli::ask::execute(args).await,
        Commands::Status(args) => cli::status::execute(args).await,
        Commands::Schema(args) => cli::schema::execute(args),
    }
}
