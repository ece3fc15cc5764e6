// ABOUTME: Concurrency and timing limits for orchestration.
// ABOUTME: Worker pool size, build cap, stop timeout and port allocation retries.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_builds")]
    pub builds: usize,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    #[serde(default = "default_port_attempts")]
    pub port_attempts: u32,
}

fn default_workers() -> usize {
    16
}

fn default_builds() -> usize {
    4
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_port_attempts() -> u32 {
    16
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            workers: default_workers(),
            builds: default_builds(),
            stop_timeout: default_stop_timeout(),
            port_attempts: default_port_attempts(),
        }
    }
}
