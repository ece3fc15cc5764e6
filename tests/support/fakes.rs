// ABOUTME: In-memory fakes for the runtime, DNS, source fetcher and notifier.
// ABOUTME: Each records what it was asked to do and can be told to fail.

use async_trait::async_trait;
use futures::stream;
use nonempty::NonEmpty;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use voyager::dns::{DnsProvider, ProviderError, ProviderErrors, RecordRequest};
use voyager::notify::{Notice, Notifier, NotifyError};
use voyager::registry::{KeyValueStore, MemoryStore, StoreError};
use voyager::runtime::{
    BuildRequest, ContainerConfig, ContainerError, ContainerInfo, ContainerOps, ContainerState,
    ImageError, ImageOps, LogError, LogLine, LogOps, LogOptions, LogStream, LogStreamResult,
};
use voyager::source::{FetchError, SourceFetcher};
use voyager::types::{ContainerId, DnsRecordId, ImageId, SourceRef};

// =============================================================================
// Runtime
// =============================================================================

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub name: String,
    pub image: ImageId,
    pub running: bool,
    pub host_port: Option<u16>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, FakeContainer>>,
    images: Mutex<HashSet<String>>,
    removed_images: Mutex<Vec<ImageId>>,
    removed_containers: Mutex<Vec<ContainerId>>,
    next_id: AtomicUsize,
    pub fail_build: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    pub fail_remove: AtomicBool,
    /// Artificial latency for stop calls, to widen race windows.
    pub stop_delay_ms: AtomicUsize,
}

impl FakeRuntime {
    pub fn container(&self, id: &ContainerId) -> Option<FakeContainer> {
        self.containers.lock().get(id.as_str()).cloned()
    }

    pub fn containers(&self) -> Vec<FakeContainer> {
        self.containers.lock().values().cloned().collect()
    }

    pub fn images(&self) -> HashSet<String> {
        self.images.lock().clone()
    }

    pub fn removed_images(&self) -> Vec<ImageId> {
        self.removed_images.lock().clone()
    }

    pub fn removed_containers(&self) -> Vec<ContainerId> {
        self.removed_containers.lock().clone()
    }

    /// Simulate a crash: the container exists but is no longer running.
    pub fn kill(&self, id: &ContainerId) {
        if let Some(container) = self.containers.lock().get_mut(id.as_str()) {
            container.running = false;
        }
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn build_image(&self, request: &BuildRequest) -> Result<ImageId, ImageError> {
        if self.fail_build.load(Ordering::SeqCst) {
            return Err(ImageError::BuildFailed("step 3/7: npm ci exited 1".to_string()));
        }
        if !request.context_dir.join(&request.dockerfile).exists() {
            return Err(ImageError::Context(format!(
                "{} missing",
                request.dockerfile
            )));
        }
        self.images.lock().insert(request.tag.clone());
        Ok(ImageId::new(request.tag.clone()))
    }

    async fn remove_image(&self, image: &ImageId, _force: bool) -> Result<(), ImageError> {
        self.removed_images.lock().push(image.clone());
        if self.images.lock().remove(image.as_str()) {
            Ok(())
        } else {
            Err(ImageError::NotFound(image.to_string()))
        }
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(&self, config: &ContainerConfig) -> Result<ContainerId, ContainerError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ContainerError::Runtime("no space left on device".to_string()));
        }
        if !self.images.lock().contains(config.image.as_str()) {
            return Err(ContainerError::ImageNotFound(config.image.to_string()));
        }
        let id = format!("c{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.containers.lock().insert(
            id.clone(),
            FakeContainer {
                name: config.name.clone(),
                image: config.image.clone(),
                running: false,
                host_port: config.ports.first().and_then(|p| p.host_port),
                labels: config.labels.clone(),
            },
        );
        Ok(ContainerId::new(id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ContainerError::Runtime("port is already allocated".to_string()));
        }
        let mut containers = self.containers.lock();
        let container = containers
            .get_mut(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if container.running {
            return Err(ContainerError::AlreadyRunning(id.to_string()));
        }
        container.running = true;
        Ok(())
    }

    async fn stop_container(&self, id: &ContainerId, _timeout: Duration) -> Result<(), ContainerError> {
        let delay = self.stop_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(ContainerError::Runtime("daemon timed out".to_string()));
        }
        let mut containers = self.containers.lock();
        let container = containers
            .get_mut(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if !container.running {
            return Err(ContainerError::NotRunning(id.to_string()));
        }
        container.running = false;
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(ContainerError::Runtime("device or resource busy".to_string()));
        }
        self.removed_containers.lock().push(id.clone());
        match self.containers.lock().remove(id.as_str()) {
            Some(_) => Ok(()),
            None => Err(ContainerError::NotFound(id.to_string())),
        }
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let containers = self.containers.lock();
        let container = containers
            .get(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        Ok(ContainerInfo {
            id: id.clone(),
            name: container.name.clone(),
            image: container.image.to_string(),
            state: if container.running {
                ContainerState::Running
            } else {
                ContainerState::Exited
            },
            labels: container.labels.clone(),
        })
    }
}

#[async_trait]
impl LogOps for FakeRuntime {
    async fn container_logs(
        &self,
        id: &ContainerId,
        _opts: &LogOptions,
    ) -> Result<LogStreamResult, LogError> {
        let name = match self.containers.lock().get(id.as_str()) {
            Some(container) => container.name.clone(),
            None => return Err(LogError::ContainerNotFound(id.to_string())),
        };
        let lines = vec![
            Ok(LogLine {
                content: format!("> {} listening on :3000\n", name),
                stream: LogStream::Stdout,
            }),
            Ok(LogLine {
                content: "warn: NODE_ENV not set\n".to_string(),
                stream: LogStream::Stderr,
            }),
        ];
        Ok(Box::pin(stream::iter(lines)))
    }
}

// =============================================================================
// DNS
// =============================================================================

#[derive(Debug, Default)]
pub struct FakeDns {
    records: Mutex<HashMap<String, String>>,
    added: Mutex<Vec<DnsRecordId>>,
    removed: Mutex<Vec<DnsRecordId>>,
    next_id: AtomicUsize,
    pub fail_add: AtomicBool,
    pub fail_remove: AtomicBool,
}

impl FakeDns {
    /// Records currently published, by id.
    pub fn records(&self) -> HashMap<String, String> {
        self.records.lock().clone()
    }

    pub fn added(&self) -> Vec<DnsRecordId> {
        self.added.lock().clone()
    }

    pub fn removed(&self) -> Vec<DnsRecordId> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl DnsProvider for FakeDns {
    async fn add_record(&self, request: &RecordRequest) -> Result<DnsRecordId, ProviderErrors> {
        if self.fail_add.load(Ordering::SeqCst) {
            let mut errors = NonEmpty::new(ProviderError {
                code: 81057,
                message: "Record already exists.".to_string(),
            });
            errors.push(ProviderError {
                code: 1004,
                message: "DNS Validation Error".to_string(),
            });
            return Err(errors);
        }
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.records.lock().insert(id.clone(), request.name.clone());
        let id = DnsRecordId::new(id);
        self.added.lock().push(id.clone());
        Ok(id)
    }

    async fn remove_record(&self, id: &DnsRecordId) -> Result<(), ProviderErrors> {
        self.removed.lock().push(id.clone());
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(NonEmpty::new(ProviderError::transport("connection reset")));
        }
        self.records.lock().remove(id.as_str());
        Ok(())
    }
}

// =============================================================================
// Source
// =============================================================================

#[derive(Debug)]
pub struct FakeFetcher {
    dockerfile: Mutex<Option<String>>,
    pub fail: AtomicBool,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn exposing(port: u16) -> Self {
        Self::with_dockerfile(Some(format!(
            "FROM node:20-alpine\nWORKDIR /app\nCOPY . .\nEXPOSE {}\nCMD [\"npm\", \"start\"]\n",
            port
        )))
    }

    pub fn with_dockerfile(dockerfile: Option<String>) -> Self {
        Self {
            dockerfile: Mutex::new(dockerfile),
            fail: AtomicBool::new(false),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn set_dockerfile(&self, dockerfile: Option<&str>) {
        *self.dockerfile.lock() = dockerfile.map(str::to_string);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn materialize(&self, source: &SourceRef, dest: &Path) -> Result<(), FetchError> {
        self.fetched.lock().push(source.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::CloneFailed {
                source_ref: source.to_string(),
                message: "repository not found".to_string(),
            });
        }
        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;
        tokio::fs::write(dest.join("package.json"), "{}")
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;
        let dockerfile = self.dockerfile.lock().clone();
        if let Some(content) = dockerfile {
            tokio::fs::write(dest.join("Dockerfile"), content)
                .await
                .map_err(|e| FetchError::Io(e.to_string()))?;
        }
        Ok(())
    }
}

// =============================================================================
// Notifier
// =============================================================================

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        self.sent.lock().push(notice.clone());
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// A store that is down: every call fails, or panics when `panic` is set.
#[derive(Debug, Default)]
pub struct BrokenStore {
    pub panic: bool,
}

impl BrokenStore {
    fn fail<T>(&self) -> Result<T, StoreError> {
        if self.panic {
            panic!("store client poisoned");
        }
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        self.fail()
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        self.fail()
    }

    async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.fail()
    }
}

/// A memory store whose scans can be pinned to an earlier moment, like a
/// listing taken just before another caller changed the records.
#[derive(Debug, Default)]
pub struct StaleScanStore {
    inner: MemoryStore,
    frozen: Mutex<Option<Vec<(String, String)>>>,
}

impl StaleScanStore {
    /// Answer every later scan with what the store holds now.
    pub async fn freeze(&self) {
        let snapshot = self.inner.scan_prefix("").await.unwrap();
        *self.frozen.lock() = Some(snapshot);
    }
}

#[async_trait]
impl KeyValueStore for StaleScanStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let frozen = self.frozen.lock().clone();
        match frozen {
            Some(entries) => Ok(entries
                .into_iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .collect()),
            None => self.inner.scan_prefix(prefix).await,
        }
    }
}

/// A memory store that refuses the next `failures` writes whose value contains `needle`.
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryStore,
    needle: String,
    pub failures: AtomicUsize,
}

impl FlakyStore {
    pub fn failing_writes_of(needle: &str) -> Self {
        Self {
            inner: MemoryStore::default(),
            needle: needle.to_string(),
            failures: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if value.contains(&self.needle)
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(StoreError::Unavailable("write timed out".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.inner.scan_prefix(prefix).await
    }
}
