// ABOUTME: Library root for voyager - the deployment orchestration engine.
// ABOUTME: The voyager binary in main.rs is a thin CLI over ControlPlane.

pub mod config;
pub mod control;
pub mod deployment;
pub mod diagnostics;
pub mod dns;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod orchestrator;
pub mod output;
pub mod proxy;
pub mod registry;
pub mod runtime;
pub mod source;
pub mod types;
pub mod workers;

pub use error::{Error, Result};
