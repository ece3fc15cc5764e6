// ABOUTME: Cloudflare DNS provider over the v4 REST API.
// ABOUTME: Publishes proxied A records and surfaces the API's error envelope.

use super::{DnsProvider, ProviderError, ProviderErrors, RecordRequest};
use crate::types::DnsRecordId;
use async_trait::async_trait;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CLOUDFLARE_API: &str = "https://api.cloudflare.com/client/v4";

#[derive(Clone)]
pub struct CloudflareDns {
    client: reqwest::Client,
    api_base: String,
    zone: String,
    token: String,
}

impl std::fmt::Debug for CloudflareDns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareDns")
            .field("api_base", &self.api_base)
            .field("zone", &self.zone)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct CreateRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
    comment: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ProviderError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RecordResult {
    id: String,
}

impl CloudflareDns {
    pub fn new(zone: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_api_base(CLOUDFLARE_API, zone, token)
    }

    /// Point at a different API root (used against mock servers).
    pub fn with_api_base(
        api_base: impl Into<String>,
        zone: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            zone: zone.into(),
            token: token.into(),
        }
    }

    fn records_url(&self) -> String {
        format!(
            "{}/zones/{}/dns_records",
            self.api_base,
            urlencoding::encode(&self.zone)
        )
    }

    async fn read_envelope<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<Option<T>, ProviderErrors> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NonEmpty::new(ProviderError::transport(e.to_string())))?;

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|_| {
            NonEmpty::new(ProviderError::transport(format!(
                "unexpected response (HTTP {})",
                status
            )))
        })?;

        if envelope.success && status.is_success() {
            return Ok(envelope.result);
        }

        Err(NonEmpty::from_vec(envelope.errors).unwrap_or_else(|| {
            NonEmpty::new(ProviderError::transport(format!(
                "request rejected (HTTP {})",
                status
            )))
        }))
    }
}

#[async_trait]
impl DnsProvider for CloudflareDns {
    async fn add_record(&self, request: &RecordRequest) -> Result<DnsRecordId, ProviderErrors> {
        let body = CreateRecord {
            record_type: "A",
            name: &request.name,
            content: &request.ip,
            // 1 means "automatic" for proxied records.
            ttl: 1,
            proxied: true,
            comment: format!(
                "Voyager {} for {} | Deployed at {}",
                request.mode,
                request.deployment,
                chrono::Utc::now().to_rfc3339()
            ),
        };

        let response = self
            .client
            .post(self.records_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NonEmpty::new(ProviderError::transport(e.to_string())))?;

        let result: Option<RecordResult> = Self::read_envelope(response).await?;
        let record = result.ok_or_else(|| {
            NonEmpty::new(ProviderError::transport("response carried no record"))
        })?;

        tracing::info!(host = %request.name, record = %record.id, "DNS record created");
        Ok(DnsRecordId::new(record.id))
    }

    async fn remove_record(&self, id: &DnsRecordId) -> Result<(), ProviderErrors> {
        let url = format!("{}/{}", self.records_url(), urlencoding::encode(id.as_str()));
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| NonEmpty::new(ProviderError::transport(e.to_string())))?;

        let _: Option<serde_json::Value> = Self::read_envelope(response).await?;
        tracing::info!(record = %id, "DNS record removed");
        Ok(())
    }
}
