// ABOUTME: Adaptive sleep between health monitor ticks.
// ABOUTME: Keeps tick work a bounded fraction of loop time however slow the tick was.

use crate::config::MonitorConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub floor: Duration,
    pub multiplier: u32,
}

impl Pacing {
    pub fn new(floor: Duration, multiplier: u32) -> Self {
        Self {
            floor,
            multiplier: multiplier.max(1),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.floor, config.multiplier)
    }

    /// `max(floor, elapsed * multiplier)`, saturating instead of overflowing.
    pub fn next_sleep(&self, elapsed: Duration) -> Duration {
        let scaled = elapsed
            .checked_mul(self.multiplier)
            .unwrap_or(Duration::MAX);
        scaled.max(self.floor)
    }
}
