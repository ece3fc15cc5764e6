// ABOUTME: The deployment record and its lifecycle state machine.
// ABOUTME: All state changes go through `Deployment::transition`, which rejects illegal edges.

mod mode;
mod state;

pub use mode::{DeploymentMode, ParseModeError};
pub use state::{DeploymentState, InvalidTransition};

use crate::types::{ContainerId, DeploymentId, DnsRecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A deployed (or once-deployed) workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    id: DeploymentId,
    container_id: ContainerId,
    host_port: u16,
    dns_record_id: DnsRecordId,
    mode: DeploymentMode,
    host: String,
    state: DeploymentState,
    source_directory: PathBuf,
    created_at: DateTime<Utc>,
}

/// Everything needed to record a freshly provisioned deployment.
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub id: DeploymentId,
    pub container_id: ContainerId,
    pub host_port: u16,
    pub dns_record_id: DnsRecordId,
    pub mode: DeploymentMode,
    pub host: String,
    pub source_directory: PathBuf,
}

impl Deployment {
    /// Create a record in `UNDEPLOYED` state, stamped with the current time.
    pub fn new(new: NewDeployment) -> Self {
        Self {
            id: new.id,
            container_id: new.container_id,
            host_port: new.host_port,
            dns_record_id: new.dns_record_id,
            mode: new.mode,
            host: new.host,
            state: DeploymentState::Undeployed,
            source_directory: new.source_directory,
            created_at: Utc::now(),
        }
    }

    /// Move to `next`, refusing edges the state machine does not allow.
    pub fn transition(&mut self, next: DeploymentState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(deployment = %self.id, from = %self.state, to = %next, "state transition");
        self.state = next;
        Ok(())
    }

    pub fn id(&self) -> &DeploymentId {
        &self.id
    }

    pub fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    pub fn host_port(&self) -> u16 {
        self.host_port
    }

    pub fn dns_record_id(&self) -> &DnsRecordId {
        &self.dns_record_id
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    pub fn source_directory(&self) -> &Path {
        &self.source_directory
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Public URL the deployment is served on.
    pub fn url(&self) -> String {
        format!("https://{}", self.host)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
