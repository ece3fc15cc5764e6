// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Create, start, stop, restart, remove and inspect containers.

use super::shared_types::{ContainerConfig, ContainerInfo, ContainerState};
use crate::types::ContainerId;
use async_trait::async_trait;
use std::time::Duration;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Create a container from the given configuration.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Start a created container.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a running container.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    /// Get detailed information about a container.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    /// Create and start a container. A container that fails to start is removed again.
    async fn create_and_start(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let id = self.create_container(config).await?;
        if let Err(e) = self.start_container(&id).await {
            if let Err(cleanup) = self.remove_container(&id, true).await {
                tracing::warn!("failed to remove unstartable container {}: {}", id, cleanup);
            }
            return Err(e);
        }
        Ok(id)
    }

    /// Whether the container exists and is running. A missing container is not running.
    async fn is_running(&self, id: &ContainerId) -> Result<bool, ContainerError> {
        match self.inspect_container(id).await {
            Ok(info) => Ok(info.state == ContainerState::Running),
            Err(ContainerError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Stop the container if it is running, then start it.
    async fn restart_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        if self.is_running(id).await? {
            match self.stop_container(id, timeout).await {
                Ok(()) | Err(ContainerError::NotRunning(_)) => {}
                Err(e) => return Err(e),
            }
        }
        match self.start_container(id).await {
            Ok(()) | Err(ContainerError::AlreadyRunning(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
