// ABOUTME: Entry point for the voyager CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use tracing_subscriber::EnvFilter;
use voyager::config::{self, Config};
use voyager::control::{ControlPlane, ListFilter};
use voyager::error::Result;
use voyager::output::Output;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(cli.output);

    if let Commands::Init { domain, force } = &cli.command {
        let cwd = env::current_dir()?;
        config::init_config(&cwd, domain.as_deref(), *force)?;
        output.success(&format!("Created {}", config::CONFIG_FILENAME));
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };
    let control = ControlPlane::from_config(&config).await?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Deploy {
            source,
            subdomain,
            mode,
        } => commands::deploy(&control, &source, mode, &subdomain, output).await,
        Commands::Stop { id } => commands::stop(&control, &id, output).await,
        Commands::Delete { id, stop } => commands::delete(&control, &id, stop, output).await,
        Commands::Restart { id } => commands::restart(&control, &id, output).await,
        Commands::Get { id } => commands::get(&control, &id, output).await,
        Commands::List { mode, state } => {
            commands::list(&control, ListFilter { mode, state }, output).await
        }
        Commands::Logs { id } => commands::logs(&control, &id, output).await,
        Commands::Monitor => commands::monitor(control, &config.monitor, output).await,
    }
}
