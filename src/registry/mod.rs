// ABOUTME: Persistent registry of deployment records.
// ABOUTME: Records live under `deployment:{id}`, a host index at `deployment-host:{host}`,
// ABOUTME: and DNS records not owned by any saved deployment at `dns-orphan:{host}`.

mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

use crate::deployment::Deployment;
use crate::types::{DeploymentId, DnsRecordId};
use std::sync::Arc;

const RECORD_PREFIX: &str = "deployment:";
const HOST_INDEX_PREFIX: &str = "deployment-host:";
const DNS_ORPHAN_PREFIX: &str = "dns-orphan:";

fn record_key(id: &DeploymentId) -> String {
    format!("{}{}", RECORD_PREFIX, id)
}

fn host_key(host: &str) -> String {
    format!("{}{}", HOST_INDEX_PREFIX, host)
}

fn orphan_key(host: &str) -> String {
    format!("{}{}", DNS_ORPHAN_PREFIX, host)
}

/// Typed access to deployment records. Cheap to clone.
///
/// Store failures are always returned to the caller; a missing record is `Ok(None)`.
#[derive(Clone)]
pub struct DeploymentRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for DeploymentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentRegistry").finish_non_exhaustive()
    }
}

impl DeploymentRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, id: &DeploymentId) -> Result<Option<Deployment>, StoreError> {
        let key = record_key(id);
        match self.store.get(&key).await? {
            Some(json) => decode(&key, &json).map(Some),
            None => Ok(None),
        }
    }

    /// Look up the deployment currently bound to `host`.
    ///
    /// A stale index entry (pointing at a deleted record, or at a record that has
    /// since moved to a different host) reads as absent.
    pub async fn find_by_host(&self, host: &str) -> Result<Option<Deployment>, StoreError> {
        let Some(id) = self.store.get(&host_key(host)).await? else {
            return Ok(None);
        };
        let deployment = self.find(&DeploymentId::new(id)).await?;
        Ok(deployment.filter(|d| d.host() == host))
    }

    /// Every stored deployment. Records that fail to decode are skipped with a warning.
    pub async fn find_all(&self) -> Result<Vec<Deployment>, StoreError> {
        let entries = self.store.scan_prefix(RECORD_PREFIX).await?;
        let mut deployments = Vec::with_capacity(entries.len());
        for (key, json) in entries {
            match decode(&key, &json) {
                Ok(deployment) => deployments.push(deployment),
                Err(e) => tracing::warn!("skipping unreadable deployment record: {}", e),
            }
        }
        Ok(deployments)
    }

    /// Upsert a record and point its host index at it.
    pub async fn save(&self, deployment: &Deployment) -> Result<(), StoreError> {
        let key = record_key(deployment.id());
        let json = deployment
            .to_json()
            .map_err(|source| StoreError::Encode {
                key: key.clone(),
                source,
            })?;
        self.store.set(&key, &json).await?;
        self.store
            .set(&host_key(deployment.host()), deployment.id().as_str())
            .await
    }

    /// Remove a record and, if it still points here, its host index entry.
    pub async fn delete(&self, id: &DeploymentId) -> Result<(), StoreError> {
        let existing = self.find(id).await?;
        self.store.delete(&record_key(id)).await?;

        if let Some(deployment) = existing {
            let index = host_key(deployment.host());
            if self.store.get(&index).await?.as_deref() == Some(id.as_str()) {
                self.store.delete(&index).await?;
            }
        }
        Ok(())
    }

    /// Note a published DNS record for `host` that no saved deployment owns yet.
    pub async fn remember_dns_record(&self, host: &str, record: &DnsRecordId) -> Result<(), StoreError> {
        self.store.set(&orphan_key(host), record.as_str()).await
    }

    /// The unowned DNS record last noted for `host`, if any.
    pub async fn orphaned_dns_record(&self, host: &str) -> Result<Option<DnsRecordId>, StoreError> {
        Ok(self.store.get(&orphan_key(host)).await?.map(DnsRecordId::new))
    }

    pub async fn forget_dns_record(&self, host: &str) -> Result<(), StoreError> {
        self.store.delete(&orphan_key(host)).await
    }
}

fn decode(key: &str, json: &str) -> Result<Deployment, StoreError> {
    Deployment::from_json(json).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}
