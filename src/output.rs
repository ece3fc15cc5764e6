// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use crate::error::{Error, Result};
use crate::orchestrator::{OperationError, Outcome};
use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    #[default]
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// One JSON document per result, for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success line, with timing in normal mode.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => {}
        }
    }

    /// Print a warning (suppressed in quiet/json mode).
    pub fn warning(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            eprintln!("Warning: {message}");
        }
    }

    /// Report an orchestrator result.
    ///
    /// JSON mode prints the whole `Outcome`; the other modes print `render(payload)`
    /// on success. Failures are handed back so the caller exits non-zero.
    pub fn report<T, F>(
        &self,
        result: std::result::Result<T, OperationError>,
        message: &str,
        render: F,
    ) -> Result<T>
    where
        T: Serialize,
        F: FnOnce(&T) -> String,
    {
        match result {
            Ok(payload) => {
                if self.mode == OutputMode::Json {
                    self.print_json(&Outcome::ok(message, &payload));
                } else {
                    self.success(&render(&payload));
                }
                Ok(payload)
            }
            Err(e) => {
                if self.mode == OutputMode::Json {
                    self.print_json(&Outcome::<()>::failed(&e));
                }
                Err(Error::Operation(e))
            }
        }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: failed to encode output: {e}"),
        }
    }
}
