// ABOUTME: Entry point for the kiln CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use kiln::config::{self, Config};
use kiln::error::Result;
use kiln::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    let cwd = env::current_dir()?;
    match cli.command {
        Commands::Init { namespace, force } => {
            config::init_config(&cwd, namespace.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy(args) => commands::deploy(Config::discover(&cwd)?, args, output).await,
        Commands::Launch(args) => commands::launch(Config::discover(&cwd)?, args, output).await,
        Commands::Undeploy { app_id } => {
            commands::undeploy(Config::discover(&cwd)?, app_id, output).await
        }
        Commands::Status { app_id } => {
            commands::status(Config::discover(&cwd)?, app_id, output).await
        }
        Commands::Cleanup { task_id } => {
            commands::cleanup(Config::discover(&cwd)?, task_id, output).await
        }
    }
}
