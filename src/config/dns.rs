// ABOUTME: DNS provider configuration.
// ABOUTME: Cloudflare zone credentials, or disabled for local development.

use super::EnvValue;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum DnsConfig {
    Cloudflare {
        zone: EnvValue,
        token: EnvValue,
        #[serde(default)]
        api_base: Option<String>,
    },
    #[default]
    Disabled,
}
