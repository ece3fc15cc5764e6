// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup and a Services builder wired to in-memory fakes.

use std::sync::{Arc, Once};

// Each test binary only uses some of these items, so allow dead_code.
#[allow(dead_code)]
pub mod fakes;

use fakes::{FakeDns, FakeFetcher, FakeRuntime, RecordingNotifier};
use voyager::config::ProxyConfig;
use voyager::control::ControlPlane;
use voyager::orchestrator::{KeyedLocks, PortAllocator, Services, Settings};
use voyager::proxy::ProxyConfigurator;
use voyager::registry::{DeploymentRegistry, KeyValueStore, MemoryStore};
use voyager::workers::WorkerPool;

pub const DOMAIN: &str = "apps.example.test";
pub const ORGANIZATION: &str = "pinkcloud";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("voyager=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fakes plus the Services built on them, so tests can both drive and inspect.
#[allow(dead_code)]
pub struct Harness {
    pub runtime: Arc<FakeRuntime>,
    pub dns: Arc<FakeDns>,
    pub fetcher: Arc<FakeFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<dyn KeyValueStore>,
    pub services: Services,
    pub workdir: tempfile::TempDir,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::build(
            ProxyConfig::default(),
            Arc::new(MemoryStore::default()),
            KeyedLocks::new(),
        )
    }

    pub fn with_proxy(proxy: ProxyConfig) -> Self {
        Self::build(proxy, Arc::new(MemoryStore::default()), KeyedLocks::new())
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self::build(ProxyConfig::default(), store, KeyedLocks::new())
    }

    /// Stands in for a second voyager process: its own fakes and lock table,
    /// but the given store and (file-backed) locks.
    pub fn sharing(store: Arc<dyn KeyValueStore>, locks: KeyedLocks) -> Self {
        Self::build(ProxyConfig::default(), store, locks)
    }

    fn build(proxy: ProxyConfig, store: Arc<dyn KeyValueStore>, locks: KeyedLocks) -> Self {
        init_tracing();
        let workdir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        let dns = Arc::new(FakeDns::default());
        let fetcher = Arc::new(FakeFetcher::exposing(3000));
        let notifier = Arc::new(RecordingNotifier::default());

        let services = Services {
            registry: DeploymentRegistry::new(Arc::clone(&store)),
            runtime: runtime.clone(),
            dns: dns.clone(),
            notifier: notifier.clone(),
            fetcher: fetcher.clone(),
            proxy: ProxyConfigurator::new(&proxy),
            workers: WorkerPool::new(8, 2),
            locks,
            ports: PortAllocator::new(16),
            settings: Settings {
                domain: DOMAIN.to_string(),
                public_ip: "203.0.113.7".parse().unwrap(),
                organization: ORGANIZATION.to_string(),
                deployments_dir: workdir.path().join("deployments"),
                descriptor: "Dockerfile".to_string(),
                stop_timeout: std::time::Duration::from_secs(1),
            },
        };

        Self {
            runtime,
            dns,
            fetcher,
            notifier,
            store,
            services,
            workdir,
        }
    }

    pub fn control(&self) -> ControlPlane {
        ControlPlane::new(self.services.clone())
    }

    /// No records and no index entries left behind.
    pub async fn registry_is_empty(&self) -> bool {
        self.store.scan_prefix("").await.unwrap().is_empty()
    }

    /// Checkouts currently present under the deployments directory.
    pub fn deployment_dirs(&self) -> Vec<std::path::PathBuf> {
        match std::fs::read_dir(&self.services.settings.deployments_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
