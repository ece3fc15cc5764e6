// ABOUTME: DNS provider used when no zone is configured.
// ABOUTME: Hands out synthetic record IDs and never calls out.

use super::{DnsProvider, ProviderErrors, RecordRequest};
use crate::types::DnsRecordId;
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct DisabledDns;

#[async_trait]
impl DnsProvider for DisabledDns {
    async fn add_record(&self, request: &RecordRequest) -> Result<DnsRecordId, ProviderErrors> {
        tracing::debug!(host = %request.name, "DNS disabled; not publishing record");
        Ok(DnsRecordId::new(format!("local-{}", request.deployment)))
    }

    async fn remove_record(&self, _id: &DnsRecordId) -> Result<(), ProviderErrors> {
        Ok(())
    }
}
