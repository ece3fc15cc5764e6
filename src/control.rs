// ABOUTME: Entry point for callers: routes each request to the right mode's orchestrator.
// ABOUTME: Also answers read-only queries (get, list) straight from the registry.

use crate::config::Config;
use crate::deployment::{Deployment, DeploymentMode, DeploymentState};
use crate::diagnostics::Diagnostics;
use crate::orchestrator::{HealOutcome, OperationError, Orchestrator, Services};
use crate::registry::DeploymentRegistry;
use crate::types::DeploymentId;

/// Narrows `list` results. Empty filter matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub mode: Option<DeploymentMode>,
    pub state: Option<DeploymentState>,
}

impl ListFilter {
    pub fn matches(&self, deployment: &Deployment) -> bool {
        self.mode.is_none_or(|mode| deployment.mode() == mode)
            && self.state.is_none_or(|state| deployment.state() == state)
    }
}

#[derive(Debug, Clone)]
pub struct ControlPlane {
    registry: DeploymentRegistry,
    preview: Orchestrator,
    production: Orchestrator,
}

impl ControlPlane {
    pub fn new(services: Services) -> Self {
        Self {
            registry: services.registry.clone(),
            preview: Orchestrator::preview(services.clone()),
            production: Orchestrator::production(services),
        }
    }

    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        Ok(Self::new(Services::from_config(config).await?))
    }

    pub fn orchestrator(&self, mode: DeploymentMode) -> &Orchestrator {
        match mode {
            DeploymentMode::Preview => &self.preview,
            DeploymentMode::Production => &self.production,
        }
    }

    pub fn registry(&self) -> &DeploymentRegistry {
        &self.registry
    }

    pub async fn deploy(
        &self,
        source: &str,
        mode: DeploymentMode,
        subdomain: &str,
    ) -> Result<Deployment, OperationError> {
        self.orchestrator(mode).deploy(source, subdomain).await
    }

    pub async fn get(&self, id: &DeploymentId) -> Result<Deployment, OperationError> {
        self.registry
            .find(id)
            .await
            .map_err(|e| OperationError::dependency("read deployment", e))?
            .ok_or_else(|| OperationError::NotFound(id.to_string()))
    }

    /// Matching deployments, oldest first.
    pub async fn list(&self, filter: ListFilter) -> Result<Vec<Deployment>, OperationError> {
        let mut deployments: Vec<Deployment> = self
            .registry
            .find_all()
            .await
            .map_err(|e| OperationError::dependency("list deployments", e))?
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();
        deployments.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });
        Ok(deployments)
    }

    pub async fn stop(&self, id: &DeploymentId) -> Result<Deployment, OperationError> {
        self.owner(id).await?.stop(id).await
    }

    pub async fn delete(&self, id: &DeploymentId) -> Result<Diagnostics, OperationError> {
        self.owner(id).await?.delete(id).await
    }

    pub async fn stop_and_delete(&self, id: &DeploymentId) -> Result<Diagnostics, OperationError> {
        self.owner(id).await?.stop_and_delete(id).await
    }

    pub async fn restart(&self, id: &DeploymentId) -> Result<Deployment, OperationError> {
        self.owner(id).await?.restart(id).await
    }

    pub async fn heal(&self, id: &DeploymentId) -> Result<HealOutcome, OperationError> {
        self.owner(id).await?.heal(id).await
    }

    pub async fn is_running(&self, id: &DeploymentId) -> Result<bool, OperationError> {
        self.owner(id).await?.is_running(id).await
    }

    pub async fn logs(&self, id: &DeploymentId) -> Result<Vec<String>, OperationError> {
        self.owner(id).await?.logs(id).await
    }

    async fn owner(&self, id: &DeploymentId) -> Result<&Orchestrator, OperationError> {
        let deployment = self.get(id).await?;
        Ok(self.orchestrator(deployment.mode()))
    }
}
