// ABOUTME: Explicit service objects shared by both orchestrators and the health monitor.
// ABOUTME: Built once at startup from config; tests assemble them from fakes.

use super::locks::KeyedLocks;
use super::ports::PortAllocator;
use crate::config::{Config, DnsConfig, StoreConfig, resolve_optional};
use crate::dns::{CloudflareDns, DisabledDns, DnsProvider};
use crate::error::Result;
use crate::notify::{NoopNotifier, Notifier, WebhookNotifier};
use crate::proxy::ProxyConfigurator;
use crate::registry::{DeploymentRegistry, FileStore, KeyValueStore, MemoryStore};
use crate::runtime::{self, Runtime};
use crate::source::{GitFetcher, SourceFetcher};
use crate::workers::WorkerPool;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Plain values the workflows need from config.
#[derive(Debug, Clone)]
pub struct Settings {
    pub domain: String,
    pub public_ip: Ipv4Addr,
    pub organization: String,
    pub deployments_dir: PathBuf,
    pub descriptor: String,
    pub stop_timeout: Duration,
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            domain: config.domain.trim().to_lowercase(),
            public_ip: config.resolved_public_ip()?,
            organization: config.source.organization.clone(),
            deployments_dir: config.deployments_dir.clone(),
            descriptor: config.descriptor.clone(),
            stop_timeout: config.limits.stop_timeout,
        })
    }
}

/// Every collaborator an orchestrator talks to. Cheap to clone.
#[derive(Clone)]
pub struct Services {
    pub registry: DeploymentRegistry,
    pub runtime: Arc<dyn Runtime>,
    pub dns: Arc<dyn DnsProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub proxy: ProxyConfigurator,
    pub workers: WorkerPool,
    pub locks: KeyedLocks,
    pub ports: PortAllocator,
    pub settings: Settings,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("proxy", &self.proxy)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Connect to every configured backend.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let settings = Settings::from_config(config)?;

        let store: Arc<dyn KeyValueStore> = match &config.store {
            StoreConfig::File { path, .. } => Arc::new(FileStore::open(path.clone()).await?),
            StoreConfig::Memory => {
                tracing::warn!("using in-memory store; deployments will not survive a restart");
                Arc::new(MemoryStore::default())
            }
        };

        let locks = match config.store.lock_dir() {
            Some(dir) => {
                tracing::debug!(dir = %dir.display(), "sharing deployment locks through lock files");
                KeyedLocks::shared(dir).await?
            }
            None => KeyedLocks::new(),
        };

        let runtime = runtime::connect(&config.runtime).await?;
        tracing::debug!(runtime = %runtime.runtime_type(), "connected to container runtime");

        let dns: Arc<dyn DnsProvider> = match &config.dns {
            DnsConfig::Cloudflare {
                zone,
                token,
                api_base,
            } => {
                let zone = zone.resolve()?;
                let token = token.resolve()?;
                match api_base {
                    Some(base) => Arc::new(CloudflareDns::with_api_base(base.clone(), zone, token)),
                    None => Arc::new(CloudflareDns::new(zone, token)),
                }
            }
            DnsConfig::Disabled => Arc::new(DisabledDns),
        };

        let operators = resolve_optional(config.notifications.operators.as_ref())?;
        let clients = resolve_optional(config.notifications.clients.as_ref())?;
        let notifier: Arc<dyn Notifier> = if operators.is_none() && clients.is_none() {
            Arc::new(NoopNotifier)
        } else {
            Arc::new(WebhookNotifier::new(operators, clients))
        };

        let token = resolve_optional(config.source.token.as_ref())?;
        let fetcher = GitFetcher::new(
            config.source.base_url.clone(),
            config.source.username.clone(),
            token,
        );

        Ok(Self {
            registry: DeploymentRegistry::new(store),
            runtime: Arc::new(runtime),
            dns,
            notifier,
            fetcher: Arc::new(fetcher),
            proxy: ProxyConfigurator::new(&config.proxy),
            workers: WorkerPool::new(config.limits.workers, config.limits.builds),
            locks,
            ports: PortAllocator::new(config.limits.port_attempts),
            settings,
        })
    }
}
