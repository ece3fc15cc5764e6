// ABOUTME: Deployment orchestration: provisioning, teardown and restarts.
// ABOUTME: One Orchestrator per mode, all sharing the same Services and lock table.

mod deploy;
mod error;
mod lifecycle;
mod locks;
mod outcome;
mod policy;
mod ports;
mod saga;
mod services;

pub use error::{DependencyError, ErrorKind, OperationError};
pub use locks::{KeyGuard, KeyedLocks, LockError, LockInfo, LockKey};
pub use lifecycle::HealOutcome;
pub use outcome::Outcome;
pub use policy::{ModePolicy, PreviewPolicy, ProductionPolicy, policy_for};
pub use ports::{PortAllocator, PortError, PortReservation, probe_free_port};
pub use saga::{Compensation, Saga};
pub use services::{Services, Settings};

use crate::deployment::{Deployment, DeploymentMode, DeploymentState};
use crate::diagnostics::{Diagnostics, Warning};
use crate::notify::{self, Notice};
use crate::types::DeploymentId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Attempts at writing a record whose runtime side already changed.
const SETTLE_ATTEMPTS: u32 = 3;
const SETTLE_BACKOFF: Duration = Duration::from_millis(100);

/// Runs the deployment workflows for one mode.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    services: Services,
    policy: Arc<dyn ModePolicy>,
}

impl Orchestrator {
    pub fn new(services: Services, policy: Arc<dyn ModePolicy>) -> Self {
        Self { services, policy }
    }

    pub fn preview(services: Services) -> Self {
        Self::new(services, Arc::new(PreviewPolicy))
    }

    pub fn production(services: Services) -> Self {
        Self::new(services, Arc::new(ProductionPolicy))
    }

    pub fn mode(&self) -> DeploymentMode {
        self.policy.mode()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Fresh read of a record owned by this orchestrator's mode.
    async fn load(&self, id: &DeploymentId) -> Result<Deployment, OperationError> {
        let found = self
            .services
            .registry
            .find(id)
            .await
            .map_err(|e| OperationError::dependency("read deployment", e))?;
        match found {
            Some(deployment) if deployment.mode() == self.mode() => Ok(deployment),
            _ => Err(OperationError::NotFound(id.to_string())),
        }
    }

    async fn lock(&self, key: LockKey) -> Result<KeyGuard, OperationError> {
        self.services
            .locks
            .lock(key)
            .await
            .map_err(|e| OperationError::dependency("acquire lock", e))
    }

    async fn persist(&self, deployment: &Deployment) -> Result<(), OperationError> {
        self.services
            .registry
            .save(deployment)
            .await
            .map_err(|e| OperationError::dependency("save deployment", e))
    }

    /// Persist a record that must catch up with the runtime, retrying briefly.
    async fn settle(&self, deployment: &Deployment) -> Result<(), OperationError> {
        let mut attempt = 1;
        loop {
            match self.persist(deployment).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < SETTLE_ATTEMPTS => {
                    tracing::warn!(
                        deployment = %deployment.id(),
                        attempt,
                        "retrying save of {} record: {}",
                        deployment.state(),
                        e
                    );
                    tokio::time::sleep(SETTLE_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Move to `next` or report that `operation` is not allowed from the current state.
    fn advance(
        deployment: &mut Deployment,
        next: DeploymentState,
        operation: &'static str,
    ) -> Result<(), OperationError> {
        deployment
            .transition(next)
            .map_err(|e| OperationError::InvalidState {
                id: deployment.id().clone(),
                state: e.from,
                operation,
            })
    }

    /// Restore a record after a failed runtime call. Failure to restore is logged only.
    async fn roll_back(&self, deployment: &mut Deployment, to: DeploymentState) {
        if let Err(e) = deployment.transition(to) {
            tracing::error!(deployment = %deployment.id(), "cannot roll back: {}", e);
            return;
        }
        if let Err(e) = self.persist(deployment).await {
            tracing::error!(
                deployment = %deployment.id(),
                "failed to persist rollback to {}: {}",
                to,
                e
            );
        }
    }

    /// Rewrite the proxy config from the registry. Failures become warnings.
    async fn refresh_proxy(&self, diagnostics: &mut Diagnostics) {
        let deployments = match self.services.registry.find_all().await {
            Ok(deployments) => deployments,
            Err(e) => {
                diagnostics.warn(Warning::proxy(format!(
                    "cannot refresh proxy config, registry unavailable: {}",
                    e
                )));
                return;
            }
        };
        if let Err(e) = self.services.proxy.refresh(&deployments).await {
            diagnostics.warn(Warning::proxy(format!("failed to write proxy config: {}", e)));
        }
    }

    /// Run a runtime call on the worker pool, folding pool failures into the result.
    async fn on_worker<F, T, E>(&self, operation: &'static str, task: F) -> Result<T, OperationError>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<DependencyError> + Send + 'static,
    {
        match self.services.workers.run(operation, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OperationError::dependency(operation, e)),
            Err(e) => Err(OperationError::dependency(operation, e)),
        }
    }

    fn notify(&self, notices: Vec<Notice>) {
        for notice in notices {
            notify::dispatch(Arc::clone(&self.services.notifier), notice);
        }
    }
}
