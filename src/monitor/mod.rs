// ABOUTME: Background health monitor that reconciles DEPLOYED records with the runtime.
// ABOUTME: Restarts dead containers and marks unrecoverable ones STOPPED.

mod pacing;

pub use pacing::Pacing;

use crate::config::MonitorConfig;
use crate::control::ControlPlane;
use crate::deployment::DeploymentState;
use crate::orchestrator::{HealOutcome, OperationError};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Records examined that were still DEPLOYED or STOPPING.
    pub checked: usize,
    pub healthy: usize,
    /// Restarted and running again.
    pub restarted: usize,
    /// Could not be brought back, or had a stop to finish; now STOPPED.
    pub stopped: usize,
    /// Checks that errored; retried next tick.
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct HealthMonitor {
    control: Arc<ControlPlane>,
    pacing: Pacing,
    fallback: Duration,
}

impl HealthMonitor {
    pub fn new(control: Arc<ControlPlane>, pacing: Pacing, fallback: Duration) -> Self {
        Self {
            control,
            pacing,
            fallback,
        }
    }

    pub fn from_config(control: Arc<ControlPlane>, config: &MonitorConfig) -> Self {
        Self::new(control, Pacing::from_config(config), config.fallback)
    }

    /// Examine every DEPLOYED (or stuck STOPPING) record once.
    ///
    /// The listing only picks candidates; each one is re-read under its lock
    /// before anything is done to it. Only a registry failure aborts the tick;
    /// per-deployment errors are counted.
    pub async fn tick(&self) -> Result<TickReport, OperationError> {
        let deployments = self
            .control
            .registry()
            .find_all()
            .await
            .map_err(|e| OperationError::dependency("list deployments", e))?;

        let mut report = TickReport::default();
        for deployment in deployments {
            if !matches!(
                deployment.state(),
                DeploymentState::Deployed | DeploymentState::Stopping
            ) {
                continue;
            }
            let id = deployment.id();

            match self.control.heal(id).await {
                Ok(HealOutcome::Healthy) => report.healthy += 1,
                Ok(HealOutcome::Restarted) => report.restarted += 1,
                Ok(HealOutcome::Stopped) => report.stopped += 1,
                // Stopped, deleted or moved on since the scan.
                Ok(HealOutcome::Skipped) | Err(OperationError::NotFound(_)) => continue,
                Err(e) => {
                    tracing::warn!(deployment = %id, host = %deployment.host(), "health check failed: {}", e);
                    report.failed += 1;
                }
            }
            report.checked += 1;
        }
        Ok(report)
    }

    /// Run ticks forever on a background task until the handle is shut down.
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown, mut signal) = watch::channel(false);
        let monitor = Arc::new(self);

        let task = tokio::spawn(async move {
            tracing::info!(
                floor = ?monitor.pacing.floor,
                multiplier = monitor.pacing.multiplier,
                "health monitor started"
            );
            loop {
                let started = Instant::now();
                let ticker = Arc::clone(&monitor);
                let sleep = match tokio::spawn(async move { ticker.tick().await }).await {
                    Ok(Ok(report)) => {
                        let elapsed = started.elapsed();
                        tracing::debug!(?report, ?elapsed, "health monitor tick");
                        monitor.pacing.next_sleep(elapsed)
                    }
                    Ok(Err(e)) => {
                        tracing::error!("health monitor tick failed: {}", e);
                        monitor.fallback
                    }
                    Err(e) => {
                        tracing::error!("health monitor tick panicked: {}", e);
                        monitor.fallback
                    }
                };

                tokio::select! {
                    _ = tokio::time::sleep(sleep) => {}
                    _ = signal.changed() => break,
                }
                if *signal.borrow() {
                    break;
                }
            }
            tracing::info!("health monitor stopped");
        });

        MonitorHandle { shutdown, task }
    }
}

/// Handle to a running monitor loop.
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Ask the loop to stop and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("health monitor task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
