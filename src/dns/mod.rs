// ABOUTME: DNS provider abstraction for per-deployment host records.
// ABOUTME: Cloudflare for real zones, a disabled provider for local development.

mod cloudflare;
mod disabled;

pub use cloudflare::CloudflareDns;
pub use disabled::DisabledDns;

use crate::deployment::DeploymentMode;
use crate::types::{DeploymentId, DnsRecordId};
use async_trait::async_trait;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

/// One error reported by the DNS provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct ProviderError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    /// A failure that happened before the provider produced an answer.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
        }
    }
}

/// A failed provider call always carries at least one error.
pub type ProviderErrors = NonEmpty<ProviderError>;

/// Render every provider error on one line.
pub fn describe(errors: &ProviderErrors) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// What to publish: an A record pointing `name` at `ip`.
#[derive(Debug, Clone)]
pub struct RecordRequest {
    pub name: String,
    pub ip: String,
    pub mode: DeploymentMode,
    pub deployment: DeploymentId,
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create the record and return the provider's ID for it.
    async fn add_record(&self, request: &RecordRequest) -> Result<DnsRecordId, ProviderErrors>;

    async fn remove_record(&self, id: &DnsRecordId) -> Result<(), ProviderErrors>;
}
