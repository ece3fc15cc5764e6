// ABOUTME: Health monitor pacing configuration.
// ABOUTME: The sleep after a tick is max(floor, tick duration * multiplier).

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_floor", with = "humantime_serde")]
    pub floor: Duration,

    #[serde(default = "default_multiplier")]
    pub multiplier: u32,

    /// Sleep used after a tick that failed or panicked.
    #[serde(default = "default_fallback", with = "humantime_serde")]
    pub fallback: Duration,
}

fn default_enabled() -> bool {
    true
}

fn default_floor() -> Duration {
    Duration::from_secs(20)
}

fn default_multiplier() -> u32 {
    19
}

fn default_fallback() -> Duration {
    Duration::from_secs(10)
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            enabled: default_enabled(),
            floor: default_floor(),
            multiplier: default_multiplier(),
            fallback: default_fallback(),
        }
    }
}
