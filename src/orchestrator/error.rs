// ABOUTME: Error taxonomy for orchestration operations.
// ABOUTME: Every failure maps to one ErrorKind so callers can react without string matching.

use crate::deployment::DeploymentState;
use crate::registry::StoreError;
use crate::runtime::{ContainerError, ImageError, LogError};
use crate::source::FetchError;
use crate::types::DeploymentId;
use crate::workers::WorkerError;
use serde::Serialize;

use super::locks::LockError;
use super::ports::PortError;

/// Coarse classification of an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself is malformed or not allowed.
    Validation,
    /// The target host is already taken.
    Conflict,
    /// A collaborator (store, runtime, DNS, source host) failed.
    Dependency,
    /// The deployment is not in a state that allows the operation.
    InvalidState,
    /// No such deployment.
    NotFound,
}

/// Which collaborator failed, and how.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Logs(#[from] LogError),

    #[error("DNS provider: {0}")]
    Dns(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Ports(#[from] PortError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("host {host} already has an active deployment ({existing})")]
    Conflict {
        host: String,
        existing: DeploymentId,
    },

    #[error("{operation} failed: {source}")]
    Dependency {
        operation: &'static str,
        #[source]
        source: DependencyError,
    },

    #[error("cannot {operation} deployment {id} while it is {state}")]
    InvalidState {
        id: DeploymentId,
        state: DeploymentState,
        operation: &'static str,
    },

    #[error("deployment {0} not found")]
    NotFound(String),
}

impl OperationError {
    pub fn dependency(operation: &'static str, source: impl Into<DependencyError>) -> Self {
        OperationError::Dependency {
            operation,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OperationError::Validation(_) => ErrorKind::Validation,
            OperationError::Conflict { .. } => ErrorKind::Conflict,
            OperationError::Dependency { .. } => ErrorKind::Dependency,
            OperationError::InvalidState { .. } => ErrorKind::InvalidState,
            OperationError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}
