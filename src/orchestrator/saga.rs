// ABOUTME: Compensation log for the deploy workflow.
// ABOUTME: Each completed side effect records its undo; a failure unwinds them newest first.

use super::Services;
use crate::diagnostics::{Diagnostics, Warning};
use crate::dns;
use crate::runtime::{ContainerError, ImageError};
use crate::types::{ContainerId, DnsRecordId, ImageId};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    RemoveDirectory(PathBuf),
    /// Remove a record this attempt published, and its journal entry under `host`.
    RemoveDnsRecord { host: String, record: DnsRecordId },
    RemoveImage(ImageId),
    RemoveContainer(ContainerId),
}

#[derive(Debug, Default)]
pub struct Saga {
    steps: Vec<Compensation>,
}

impl Saga {
    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    /// Undo every recorded step in reverse order. Failures become warnings.
    pub async fn unwind(self, services: &Services) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();
        for step in self.steps.into_iter().rev() {
            tracing::debug!(?step, "compensating");
            compensate(services, step, &mut diagnostics).await;
        }
        diagnostics
    }
}

async fn compensate(services: &Services, step: Compensation, diagnostics: &mut Diagnostics) {
    match step {
        Compensation::RemoveContainer(id) => {
            let runtime = Arc::clone(&services.runtime);
            let target = id.clone();
            let result = services
                .workers
                .run("remove container", async move {
                    runtime.remove_container(&target, true).await
                })
                .await;
            match result {
                Ok(Ok(())) | Ok(Err(ContainerError::NotFound(_))) => {}
                Ok(Err(e)) => diagnostics.warn(Warning::compensation(format!(
                    "failed to remove container {}: {}",
                    id, e
                ))),
                Err(e) => diagnostics.warn(Warning::compensation(format!(
                    "failed to remove container {}: {}",
                    id, e
                ))),
            }
        }
        Compensation::RemoveImage(image) => {
            let runtime = Arc::clone(&services.runtime);
            let target = image.clone();
            let result = services
                .workers
                .run("remove image", async move { runtime.remove_image(&target, true).await })
                .await;
            match result {
                Ok(Ok(())) | Ok(Err(ImageError::NotFound(_))) => {}
                Ok(Err(e)) => diagnostics.warn(Warning::compensation(format!(
                    "failed to remove image {}: {}",
                    image, e
                ))),
                Err(e) => diagnostics.warn(Warning::compensation(format!(
                    "failed to remove image {}: {}",
                    image, e
                ))),
            }
        }
        Compensation::RemoveDnsRecord { host, record } => {
            match services.dns.remove_record(&record).await {
                Ok(()) => {
                    if let Err(e) = services.registry.forget_dns_record(&host).await {
                        tracing::warn!(host = %host, "failed to clear DNS journal entry: {}", e);
                    }
                }
                // The journal entry stays, so the next deploy of this host can adopt the record.
                Err(errors) => diagnostics.warn(Warning::dns_orphan(format!(
                    "failed to remove DNS record {} for {}: {}",
                    record,
                    host,
                    dns::describe(&errors)
                ))),
            }
        }
        Compensation::RemoveDirectory(path) => match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => diagnostics.warn(Warning::compensation(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        },
    }
}
