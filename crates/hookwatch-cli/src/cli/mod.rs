//! CLI wiring: argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use clap::Parser;

use self::args::{Cli, Commands};

/// Parse arguments and run the selected command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Audit(audit_args) => commands::audit::execute(audit_args).await,
        Commands::Worker => commands::worker::execute().await,
    }
}
