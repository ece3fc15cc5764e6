// ABOUTME: The deploy workflow: source, DNS, image, container, record.
// ABOUTME: Every committed step is logged in a saga and undone in reverse if a later one fails.

use super::saga::{Compensation, Saga};
use super::{DependencyError, LockKey, OperationError, Orchestrator};
use crate::deployment::{Deployment, DeploymentState, NewDeployment};
use crate::diagnostics::Diagnostics;
use crate::dns::{self, RecordRequest};
use crate::runtime::{BuildRequest, ContainerConfig, PortMapping};
use crate::source::BuildDescriptor;
use crate::types::{DeploymentId, DnsRecordId, SourceRef, Subdomain};
use std::collections::HashSet;
use std::sync::Arc;

impl Orchestrator {
    /// Provision a new deployment of `source` at `subdomain`.
    ///
    /// Validation and host conflicts are reported before any side effect. A failure
    /// after that unwinds everything this attempt created, then returns the original
    /// error.
    pub async fn deploy(&self, source: &str, subdomain: &str) -> Result<Deployment, OperationError> {
        let settings = &self.services.settings;

        let source = SourceRef::parse(source)
            .map_err(|e| OperationError::Validation(format!("source {:?}: {}", source, e)))?;
        if !source.belongs_to(&settings.organization) {
            return Err(OperationError::Validation(format!(
                "{} does not belong to organization {}",
                source, settings.organization
            )));
        }
        let subdomain = Subdomain::new(subdomain)
            .map_err(|e| OperationError::Validation(format!("subdomain {:?}: {}", subdomain, e)))?;
        let host = self.policy.host_for(&subdomain, &settings.domain);

        // Held until the record is saved, so a concurrent deploy sees it.
        let _host_guard = self.lock(LockKey::host(&host)).await?;
        let existing = self
            .services
            .registry
            .find_by_host(&host)
            .await
            .map_err(|e| OperationError::dependency("look up host", e))?;
        if let Some(existing) = existing {
            return Err(OperationError::Conflict {
                host,
                existing: existing.id().clone(),
            });
        }

        let id = DeploymentId::generate();
        let _id_guard = self.lock(LockKey::deployment(&id)).await?;
        tracing::info!(deployment = %id, host = %host, source = %source, mode = %self.mode(), "deploying");

        let mut saga = Saga::default();
        match self.provision(&id, &source, &host, &mut saga).await {
            Ok(deployment) => {
                tracing::info!(deployment = %id, host = %host, port = deployment.host_port(), "deployed");
                let mut diagnostics = Diagnostics::default();
                self.refresh_proxy(&mut diagnostics).await;
                self.notify(self.policy.deployed_notices(&deployment));
                Ok(deployment)
            }
            Err(e) => {
                tracing::error!(deployment = %id, host = %host, "deploy failed: {}", e);
                let diagnostics = saga.unwind(&self.services).await;
                if diagnostics.has_warnings() {
                    tracing::warn!(
                        deployment = %id,
                        warnings = diagnostics.warnings().len(),
                        "compensation left resources behind"
                    );
                }
                Err(e)
            }
        }
    }

    async fn provision(
        &self,
        id: &DeploymentId,
        source: &SourceRef,
        host: &str,
        saga: &mut Saga,
    ) -> Result<Deployment, OperationError> {
        let services = &self.services;
        let mode = self.mode();

        let dir = services
            .settings
            .deployments_dir
            .join(format!("{}-{}", id, mode));
        saga.record(Compensation::RemoveDirectory(dir.clone()));
        services
            .fetcher
            .materialize(source, &dir)
            .await
            .map_err(|e| OperationError::dependency("fetch source", e))?;

        let descriptor = BuildDescriptor::load(&dir, &services.settings.descriptor)
            .await
            .map_err(|e| OperationError::Validation(e.to_string()))?;
        tracing::debug!(deployment = %id, port = descriptor.internal_port, "build descriptor loaded");

        let dns_record_id = self.publish_dns(id, host, saga).await?;

        let tag = format!("voyager-{}-{}", mode, id);
        let mut labels = services.proxy.labels_for(host, descriptor.internal_port);
        labels.insert("voyager.deployment".to_string(), id.to_string());
        labels.insert("voyager.mode".to_string(), mode.to_string());

        let request = BuildRequest {
            tag: tag.clone(),
            context_dir: dir.clone(),
            dockerfile: descriptor.file_name.clone(),
            labels: labels.clone(),
        };
        let runtime = Arc::clone(&services.runtime);
        let image = services
            .workers
            .run_build("build image", async move { runtime.build_image(&request).await })
            .await
            .map_err(|e| OperationError::dependency("build image", e))?
            .map_err(|e| OperationError::dependency("build image", e))?;
        saga.record(Compensation::RemoveImage(image.clone()));
        tracing::debug!(deployment = %id, image = %image, "image built");

        // Held until the record carrying the port is saved.
        let _ports_guard = self.lock(LockKey::ports()).await?;
        let taken: HashSet<u16> = services
            .registry
            .find_all()
            .await
            .map_err(|e| OperationError::dependency("list deployments", e))?
            .iter()
            .map(Deployment::host_port)
            .collect();
        let reservation = services
            .ports
            .reserve(&taken)
            .await
            .map_err(|e| OperationError::dependency("allocate port", e))?;

        let config = ContainerConfig {
            name: tag,
            image,
            labels,
            ports: vec![PortMapping::tcp(reservation.port(), descriptor.internal_port)],
        };
        let runtime = Arc::clone(&services.runtime);
        let container_id = self
            .on_worker("start container", async move { runtime.create_and_start(&config).await })
            .await?;
        saga.record(Compensation::RemoveContainer(container_id.clone()));
        tracing::debug!(deployment = %id, container = %container_id, port = reservation.port(), "container started");

        let mut deployment = Deployment::new(NewDeployment {
            id: id.clone(),
            container_id,
            host_port: reservation.port(),
            dns_record_id,
            mode,
            host: host.to_string(),
            source_directory: dir,
        });
        Self::advance(&mut deployment, DeploymentState::Deployed, "deploy")?;
        self.persist(&deployment).await?;
        drop(reservation);

        // The saved record owns the DNS record now.
        if let Err(e) = services.registry.forget_dns_record(host).await {
            tracing::warn!(deployment = %id, host = %host, "failed to clear DNS journal entry: {}", e);
        }
        Ok(deployment)
    }

    /// Create the DNS record for `host`, falling back to an orphan noted in the journal.
    ///
    /// A newly created record is journaled before anything else happens, so an
    /// interrupted deploy leaves a trace the next attempt at this host can adopt.
    async fn publish_dns(
        &self,
        id: &DeploymentId,
        host: &str,
        saga: &mut Saga,
    ) -> Result<DnsRecordId, OperationError> {
        let services = &self.services;
        let request = RecordRequest {
            name: host.to_string(),
            ip: services.settings.public_ip.to_string(),
            mode: self.mode(),
            deployment: id.clone(),
        };

        let errors = match services.dns.add_record(&request).await {
            Ok(record) => {
                if let Err(e) = services.registry.remember_dns_record(host, &record).await {
                    tracing::warn!(deployment = %id, record = %record, "failed to journal DNS record: {}", e);
                }
                saga.record(Compensation::RemoveDnsRecord {
                    host: host.to_string(),
                    record: record.clone(),
                });
                tracing::debug!(deployment = %id, record = %record, "DNS record created");
                return Ok(record);
            }
            Err(errors) => errors,
        };

        let described = dns::describe(&errors);
        tracing::warn!(deployment = %id, host = %host, "DNS provider refused record: {}", described);

        // An adopted record is left in place (and in the journal) if this attempt fails.
        match services.registry.orphaned_dns_record(host).await {
            Ok(Some(record)) => {
                tracing::info!(deployment = %id, record = %record, "adopting orphaned DNS record");
                Ok(record)
            }
            Ok(None) => Err(OperationError::Dependency {
                operation: "create DNS record",
                source: DependencyError::Dns(described),
            }),
            Err(e) => Err(OperationError::Dependency {
                operation: "create DNS record",
                source: DependencyError::Dns(format!(
                    "{}; reconciliation failed: {}",
                    described, e
                )),
            }),
        }
    }
}
