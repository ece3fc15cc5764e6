// ABOUTME: Monitor command: runs the health monitor in the foreground.
// ABOUTME: Stops cleanly on Ctrl-C.

use std::sync::Arc;
use voyager::config::MonitorConfig;
use voyager::control::ControlPlane;
use voyager::error::{Error, Result};
use voyager::monitor::HealthMonitor;
use voyager::output::Output;

pub async fn monitor(control: ControlPlane, config: &MonitorConfig, output: Output) -> Result<()> {
    if !config.enabled {
        return Err(Error::InvalidConfig(
            "monitor.enabled is false in the config".to_string(),
        ));
    }

    let handle = HealthMonitor::from_config(Arc::new(control), config).spawn();
    output.progress(&format!(
        "Health monitor running (floor {:?}, multiplier {}); press Ctrl-C to stop",
        config.floor, config.multiplier
    ));

    tokio::signal::ctrl_c().await?;
    output.progress("Stopping health monitor...");
    handle.shutdown().await;
    output.success("Health monitor stopped");
    Ok(())
}
