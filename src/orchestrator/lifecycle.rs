// ABOUTME: Lifecycle operations on existing deployments: stop, delete, restart, heal, logs.
// ABOUTME: Each takes the deployment's lock and re-reads the record before acting.

use super::{LockKey, OperationError, Orchestrator};
use crate::deployment::{Deployment, DeploymentState};
use crate::diagnostics::{Diagnostics, Warning};
use crate::dns;
use crate::runtime::{ContainerError, ImageError, LogOptions};
use crate::types::{DeploymentId, ImageId};
use std::sync::Arc;

/// What a health check did to one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealOutcome {
    /// DEPLOYED and running.
    Healthy,
    /// Was down; running again after a restart.
    Restarted,
    /// Could not be brought back, or was left STOPPING; now STOPPED.
    Stopped,
    /// No longer DEPLOYED or STOPPING by the time the lock was taken.
    Skipped,
}

impl Orchestrator {
    /// Stop a DEPLOYED deployment's container, or finish a stop left STOPPING.
    pub async fn stop(&self, id: &DeploymentId) -> Result<Deployment, OperationError> {
        let _guard = self.lock(LockKey::deployment(id)).await?;
        let mut deployment = self.load(id).await?;
        self.stop_locked(&mut deployment).await?;

        let mut diagnostics = Diagnostics::default();
        self.refresh_proxy(&mut diagnostics).await;
        Ok(deployment)
    }

    /// Tear down a STOPPED deployment and forget it.
    ///
    /// Once the record is gone the operation has succeeded; leftovers (directory,
    /// DNS record, image) are reported in the returned diagnostics.
    pub async fn delete(&self, id: &DeploymentId) -> Result<Diagnostics, OperationError> {
        let _guard = self.lock(LockKey::deployment(id)).await?;
        let mut deployment = self.load(id).await?;
        self.delete_locked(&mut deployment).await
    }

    /// Stop, then delete, without releasing the lock in between.
    pub async fn stop_and_delete(&self, id: &DeploymentId) -> Result<Diagnostics, OperationError> {
        let _guard = self.lock(LockKey::deployment(id)).await?;
        let mut deployment = self.load(id).await?;
        self.stop_locked(&mut deployment).await?;
        self.delete_locked(&mut deployment).await
    }

    /// Stop the deployment if it is running, then start its container again in place.
    pub async fn restart(&self, id: &DeploymentId) -> Result<Deployment, OperationError> {
        let _guard = self.lock(LockKey::deployment(id)).await?;
        let mut deployment = self.load(id).await?;
        self.restart_locked(&mut deployment).await?;

        let mut diagnostics = Diagnostics::default();
        self.refresh_proxy(&mut diagnostics).await;
        Ok(deployment)
    }

    /// Bring the record and its container back in line, judged on a fresh read.
    ///
    /// A DEPLOYED record whose container is down is restarted; if that does not
    /// get it running it is marked STOPPED. A record left STOPPING has its stop
    /// finished. Anything else is skipped, so a stale listing never revives a
    /// deployment someone stopped in the meantime.
    pub async fn heal(&self, id: &DeploymentId) -> Result<HealOutcome, OperationError> {
        let _guard = self.lock(LockKey::deployment(id)).await?;
        let mut deployment = self.load(id).await?;
        let mut diagnostics = Diagnostics::default();

        match deployment.state() {
            DeploymentState::Deployed => {}
            DeploymentState::Stopping => {
                self.stop_locked(&mut deployment).await?;
                self.refresh_proxy(&mut diagnostics).await;
                return Ok(HealOutcome::Stopped);
            }
            _ => return Ok(HealOutcome::Skipped),
        }

        if self.container_running(&deployment).await? {
            return Ok(HealOutcome::Healthy);
        }

        tracing::info!(deployment = %id, host = %deployment.host(), "container not running; restarting");
        if let Err(e) = self.restart_locked(&mut deployment).await {
            tracing::warn!(deployment = %id, "restart failed: {}", e);
            deployment = self.load(id).await?;
        }

        let running = deployment.state() == DeploymentState::Deployed
            && match self.container_running(&deployment).await {
                Ok(running) => running,
                Err(e) => {
                    tracing::warn!(deployment = %id, "recheck failed: {}", e);
                    false
                }
            };
        let outcome = if running {
            HealOutcome::Restarted
        } else {
            self.mark_stopped_locked(&mut deployment).await?;
            tracing::warn!(
                deployment = %id,
                host = %deployment.host(),
                "deployment could not be restarted and is now stopped"
            );
            HealOutcome::Stopped
        };

        self.refresh_proxy(&mut diagnostics).await;
        Ok(outcome)
    }

    /// Whether the deployment is DEPLOYED and its container is actually running.
    pub async fn is_running(&self, id: &DeploymentId) -> Result<bool, OperationError> {
        let _guard = self.lock(LockKey::deployment(id)).await?;
        let deployment = self.load(id).await?;
        if deployment.state() != DeploymentState::Deployed {
            return Ok(false);
        }
        self.container_running(&deployment).await
    }

    /// Captured stdout and stderr of the deployment's container.
    pub async fn logs(&self, id: &DeploymentId) -> Result<Vec<String>, OperationError> {
        let _guard = self.lock(LockKey::deployment(id)).await?;
        let deployment = self.load(id).await?;

        let runtime = Arc::clone(&self.services.runtime);
        let container = deployment.container_id().clone();
        self.on_worker("read logs", async move {
            runtime.collect_logs(&container, &LogOptions::snapshot()).await
        })
        .await
    }

    async fn container_running(&self, deployment: &Deployment) -> Result<bool, OperationError> {
        let runtime = Arc::clone(&self.services.runtime);
        let container = deployment.container_id().clone();
        self.on_worker("inspect container", async move { runtime.is_running(&container).await })
            .await
    }

    async fn restart_locked(&self, deployment: &mut Deployment) -> Result<(), OperationError> {
        match deployment.state() {
            DeploymentState::Deployed | DeploymentState::Stopping => {
                self.stop_locked(deployment).await?
            }
            DeploymentState::Stopped => {}
            state => {
                return Err(OperationError::InvalidState {
                    id: deployment.id().clone(),
                    state,
                    operation: "restart",
                });
            }
        }

        let runtime = Arc::clone(&self.services.runtime);
        let container = deployment.container_id().clone();
        let timeout = self.services.settings.stop_timeout;
        self.on_worker("restart container", async move {
            runtime.restart_container(&container, timeout).await
        })
        .await?;

        Self::advance(deployment, DeploymentState::Deployed, "restart")?;
        self.persist(deployment).await?;
        tracing::info!(deployment = %deployment.id(), host = %deployment.host(), "restarted");
        Ok(())
    }

    /// Record that a deployment is down without touching its container.
    /// States other than DEPLOYED and STOPPING are left alone.
    async fn mark_stopped_locked(&self, deployment: &mut Deployment) -> Result<(), OperationError> {
        match deployment.state() {
            DeploymentState::Deployed => {
                Self::advance(deployment, DeploymentState::Stopping, "mark stopped")?;
                Self::advance(deployment, DeploymentState::Stopped, "mark stopped")?;
            }
            DeploymentState::Stopping => {
                Self::advance(deployment, DeploymentState::Stopped, "mark stopped")?;
            }
            _ => return Ok(()),
        }
        self.settle(deployment).await
    }

    /// Stop the container of a DEPLOYED record. A record already STOPPING (an
    /// earlier stop whose final save was lost) goes straight to the runtime call.
    async fn stop_locked(&self, deployment: &mut Deployment) -> Result<(), OperationError> {
        if deployment.state() != DeploymentState::Stopping {
            Self::advance(deployment, DeploymentState::Stopping, "stop")?;
            self.persist(deployment).await?;
        }

        let runtime = Arc::clone(&self.services.runtime);
        let container = deployment.container_id().clone();
        let timeout = self.services.settings.stop_timeout;
        let stopped = self
            .on_worker("stop container", async move {
                match runtime.stop_container(&container, timeout).await {
                    Ok(()) | Err(ContainerError::NotRunning(_)) | Err(ContainerError::NotFound(_)) => {
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            })
            .await;
        if let Err(e) = stopped {
            self.roll_back(deployment, DeploymentState::Deployed).await;
            return Err(e);
        }

        Self::advance(deployment, DeploymentState::Stopped, "stop")?;
        // The container is down; a lost save leaves the record STOPPING, which
        // the next stop, restart or health check finishes.
        self.settle(deployment).await?;
        tracing::info!(deployment = %deployment.id(), host = %deployment.host(), "stopped");
        Ok(())
    }

    async fn delete_locked(&self, deployment: &mut Deployment) -> Result<Diagnostics, OperationError> {
        Self::advance(deployment, DeploymentState::Deleting, "delete")?;
        self.persist(deployment).await?;

        let runtime = Arc::clone(&self.services.runtime);
        let container = deployment.container_id().clone();
        let removed = self
            .on_worker("remove container", async move {
                match runtime.remove_container(&container, true).await {
                    Ok(()) | Err(ContainerError::NotFound(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            })
            .await;
        if let Err(e) = removed {
            self.roll_back(deployment, DeploymentState::Stopped).await;
            return Err(e);
        }

        let mut diagnostics = Diagnostics::default();
        match tokio::fs::remove_dir_all(deployment.source_directory()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => diagnostics.warn(Warning::cleanup(format!(
                "failed to remove {}: {}",
                deployment.source_directory().display(),
                e
            ))),
        }

        if let Err(e) = self.services.registry.delete(deployment.id()).await {
            self.roll_back(deployment, DeploymentState::Stopped).await;
            return Err(OperationError::dependency("delete record", e));
        }
        tracing::info!(deployment = %deployment.id(), host = %deployment.host(), "deleted");

        // The record is gone; nothing below can fail the delete.
        let host = deployment.host();
        let record = deployment.dns_record_id();
        let journaled = match self.services.dns.remove_record(record).await {
            Ok(()) => self.services.registry.forget_dns_record(host).await,
            Err(errors) => {
                diagnostics.warn(Warning::dns_orphan(format!(
                    "DNS record {} for {} was not removed: {}",
                    record,
                    host,
                    dns::describe(&errors)
                )));
                self.services.registry.remember_dns_record(host, record).await
            }
        };
        if let Err(e) = journaled {
            tracing::warn!(deployment = %deployment.id(), "failed to update DNS journal: {}", e);
        }

        let runtime = Arc::clone(&self.services.runtime);
        let image = ImageId::new(format!("voyager-{}-{}", deployment.mode(), deployment.id()));
        let target = image.clone();
        let removed = self
            .on_worker("remove image", async move {
                match runtime.remove_image(&target, true).await {
                    Ok(()) | Err(ImageError::NotFound(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            })
            .await;
        if let Err(e) = removed {
            diagnostics.warn(Warning::cleanup(format!("image {} was not removed: {}", image, e)));
        }

        self.notify(self.policy.deleted_notices(deployment));
        self.refresh_proxy(&mut diagnostics).await;
        Ok(diagnostics)
    }
}
