// ABOUTME: Configuration types and parsing for voyager.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, defaults and validation.

mod dns;
mod env_value;
mod init;
mod limits;
mod monitor;

pub use dns::DnsConfig;
pub use env_value::{EnvValue, resolve_optional};
pub use init::init_config;
pub use limits::LimitsConfig;
pub use monitor::MonitorConfig;

use crate::error::{Error, Result};
use crate::runtime::RuntimeConfig;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "voyager.yml";
pub const CONFIG_FILENAME_ALT: &str = "voyager.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".voyager/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Apex domain deployments are published under.
    pub domain: String,

    /// Address DNS records point at.
    pub public_ip: EnvValue,

    #[serde(default = "default_deployments_dir")]
    pub deployments_dir: PathBuf,

    /// Build descriptor file name inside each repository.
    #[serde(default = "default_descriptor")]
    pub descriptor: String,

    pub source: SourceConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_base_url")]
    pub base_url: String,

    /// Only repositories owned by this organization may be deployed.
    pub organization: String,

    #[serde(default = "default_source_username")]
    pub username: String,

    #[serde(default)]
    pub token: Option<EnvValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    File {
        #[serde(default = "default_store_path")]
        path: PathBuf,

        /// Lock files shared by every voyager process using this store.
        /// Defaults to `locks` beside the store directory.
        #[serde(default)]
        locks: Option<PathBuf>,
    },
    /// Single process only; locks are never shared.
    Memory,
}

impl StoreConfig {
    /// Where cross-process lock files live, if the backend is shared.
    pub fn lock_dir(&self) -> Option<PathBuf> {
        match self {
            StoreConfig::File { path, locks } => Some(
                locks
                    .clone()
                    .unwrap_or_else(|| path.with_file_name("locks")),
            ),
            StoreConfig::Memory => None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_store_path(),
            locks: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    /// Webhook for platform operators.
    #[serde(default)]
    pub operators: Option<EnvValue>,

    /// Webhook for production clients.
    #[serde(default)]
    pub clients: Option<EnvValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_entrypoints")]
    pub entrypoints: String,

    /// Caddyfile rewritten after every lifecycle change, if set.
    #[serde(default)]
    pub caddyfile: Option<PathBuf>,

    /// Site blocks kept at the top of the Caddyfile.
    #[serde(default)]
    pub caddyfile_preamble: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            entrypoints: default_entrypoints(),
            caddyfile: None,
            caddyfile_preamble: None,
        }
    }
}

fn default_deployments_dir() -> PathBuf {
    PathBuf::from("/var/opt/voyager/deployments")
}

fn default_descriptor() -> String {
    "Dockerfile".to_string()
}

fn default_source_base_url() -> String {
    "https://github.com".to_string()
}

fn default_source_username() -> String {
    "x-access-token".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/voyager/registry")
}

fn default_entrypoints() -> String {
    "http,https".to_string()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        let domain = self.domain.trim();
        if domain.is_empty() || domain.starts_with('.') || domain.ends_with('.') {
            return Err(Error::InvalidConfig(format!("invalid domain: {:?}", self.domain)));
        }
        if self.source.organization.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "source.organization cannot be empty".to_string(),
            ));
        }
        if self.limits.workers == 0 || self.limits.builds == 0 {
            return Err(Error::InvalidConfig(
                "limits.workers and limits.builds must be at least 1".to_string(),
            ));
        }
        if self.limits.port_attempts == 0 {
            return Err(Error::InvalidConfig(
                "limits.port_attempts must be at least 1".to_string(),
            ));
        }
        if self.monitor.multiplier == 0 {
            return Err(Error::InvalidConfig(
                "monitor.multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve and parse the public address.
    pub fn resolved_public_ip(&self) -> Result<Ipv4Addr> {
        let raw = self.public_ip.resolve()?;
        raw.trim()
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("public_ip is not an IPv4 address: {raw}")))
    }
}
