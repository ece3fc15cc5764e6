// ABOUTME: Command module aggregator for the voyager CLI.
// ABOUTME: Re-exports the deployment and monitor command handlers.

mod deployments;
mod monitor;

pub use deployments::{delete, deploy, get, list, logs, restart, stop};
pub use monitor::monitor;
