// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use voyager::deployment::{DeploymentMode, DeploymentState};
use voyager::output::OutputMode;

#[derive(Parser)]
#[command(name = "voyager")]
#[command(about = "Preview and production deployments for containerized repositories")]
#[command(version)]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// How results are printed
    #[arg(short, long, global = true, value_enum, default_value_t = OutputMode::Normal)]
    pub output: OutputMode,

    /// Config file (default: voyager.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new voyager.yml configuration file
    Init {
        /// Apex domain deployments are published under
        #[arg(long)]
        domain: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Deploy a repository (org/repo or org/repo#branch)
    Deploy {
        source: String,

        /// Subdomain to publish under
        #[arg(short, long)]
        subdomain: String,

        #[arg(short, long, default_value = "preview", value_parser = parse_mode)]
        mode: DeploymentMode,
    },

    /// Stop a deployment's container
    Stop { id: String },

    /// Delete a stopped deployment
    Delete {
        id: String,

        /// Stop the deployment first if it is running
        #[arg(long)]
        stop: bool,
    },

    /// Restart a deployment in place
    Restart { id: String },

    /// Show one deployment
    Get { id: String },

    /// List deployments
    List {
        #[arg(long, value_parser = parse_mode)]
        mode: Option<DeploymentMode>,

        #[arg(long, value_parser = parse_state)]
        state: Option<DeploymentState>,
    },

    /// Print a deployment's captured output
    Logs { id: String },

    /// Run the health monitor until interrupted
    Monitor,
}

fn parse_mode(value: &str) -> Result<DeploymentMode, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn parse_state(value: &str) -> Result<DeploymentState, String> {
    DeploymentState::ALL
        .into_iter()
        .find(|state| state.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown state: {value}"))
}
