// ABOUTME: Per-key locks serializing operations on one deployment, host or the port table.
// ABOUTME: In-process async mutexes, optionally backed by lock files shared between processes.

use crate::types::DeploymentId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

type Table = Mutex<HashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>;

/// How often a waiter re-checks a lock file held by another process.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lock files older than this are assumed abandoned.
const STALE_AFTER_HOURS: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Deployment(DeploymentId),
    Host(String),
    /// Held while a deploy picks a host port and records it.
    Ports,
}

impl LockKey {
    pub fn deployment(id: &DeploymentId) -> Self {
        LockKey::Deployment(id.clone())
    }

    pub fn host(host: &str) -> Self {
        LockKey::Host(host.to_string())
    }

    pub fn ports() -> Self {
        LockKey::Ports
    }

    fn file_name(&self) -> String {
        match self {
            LockKey::Deployment(id) => format!("deployment-{}.lock", urlencoding::encode(id.as_str())),
            LockKey::Host(host) => format!("host-{}.lock", urlencoding::encode(host)),
            LockKey::Ports => "ports.lock".to_string(),
        }
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockKey::Deployment(id) => write!(f, "deployment {}", id),
            LockKey::Host(host) => write!(f, "host {}", host),
            LockKey::Ports => write!(f, "port table"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        LockError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Who holds a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub key: String,
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current(key: &LockKey) -> Self {
        Self {
            pid: std::process::id(),
            key: key.to_string(),
            acquired_at: Utc::now(),
        }
    }

    /// Old enough to break, or left behind by a process that no longer exists.
    pub fn is_stale(&self) -> bool {
        (Utc::now() - self.acquired_at).num_hours() >= STALE_AFTER_HOURS || !process_alive(self.pid)
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    table: Arc<Table>,
    dir: Option<Arc<PathBuf>>,
}

/// A lock file owned by this process; removed on drop.
#[derive(Debug)]
struct LockFile {
    path: PathBuf,
}

impl Drop for LockFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to release lock file {}: {}", self.path.display(), e),
        }
    }
}

/// Held lock; releases on drop.
pub struct KeyGuard {
    key: LockKey,
    file: Option<LockFile>,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<Table>,
}

impl std::fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.key).finish()
    }
}

impl KeyedLocks {
    /// Locks visible to this process only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks also claimed through files in `dir`, so every process sharing the
    /// directory (and the registry next to it) excludes the others.
    pub async fn shared(dir: impl Into<PathBuf>) -> Result<Self, LockError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| LockError::io(&dir, e))?;
        Ok(Self {
            table: Arc::default(),
            dir: Some(Arc::new(dir)),
        })
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: LockKey) -> Result<KeyGuard, LockError> {
        let entry = Arc::clone(self.table.lock().entry(key.clone()).or_default());
        let guard = entry.lock_owned().await;
        // From here on the guard cleans up the table entry, even if the file lock fails.
        let mut held = KeyGuard {
            key,
            file: None,
            guard: Some(guard),
            table: Arc::clone(&self.table),
        };
        if let Some(dir) = &self.dir {
            held.file = Some(acquire_file(dir, &held.key).await?);
        }
        Ok(held)
    }

    /// Number of keys currently held or awaited in this process.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn acquire_file(dir: &Path, key: &LockKey) -> Result<LockFile, LockError> {
    let path = dir.join(key.file_name());
    let info = LockInfo::current(key);
    let json = serde_json::to_string(&info)
        .map_err(|e| LockError::io(&path, std::io::Error::other(e)))?;

    let mut waiting_logged = false;
    loop {
        match publish(&path, &json).await {
            Ok(()) => return Ok(LockFile { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(LockError::io(&path, e)),
        }

        if break_if_stale(&path).await? {
            continue;
        }
        if !waiting_logged {
            tracing::debug!(%key, "lock held by another process; waiting");
            waiting_logged = true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Write the lock info beside the lock path and hard-link it into place, so the
/// lock file never exists without its contents.
async fn publish(path: &Path, json: &str) -> std::io::Result<()> {
    let staging = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&staging, json).await?;
    let linked = tokio::fs::hard_link(&staging, path).await;
    if let Err(e) = tokio::fs::remove_file(&staging).await {
        tracing::debug!("failed to remove {}: {}", staging.display(), e);
    }
    linked
}

/// Remove the lock file at `path` if its holder is gone. Returns whether to retry at once.
async fn break_if_stale(path: &Path) -> Result<bool, LockError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        // Released between our attempt and this read.
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(LockError::io(path, e)),
    };

    match serde_json::from_str::<LockInfo>(&content) {
        Ok(holder) if !holder.is_stale() => return Ok(false),
        Ok(holder) => tracing::warn!(
            "breaking stale lock on {} held by pid {} since {}",
            holder.key,
            holder.pid,
            holder.acquired_at
        ),
        Err(_) => tracing::warn!("breaking unreadable lock file {}", path.display()),
    }

    // Only remove what we inspected; a fresh holder may have replaced it.
    if tokio::fs::read_to_string(path).await.ok().as_deref() == Some(content.as_str()) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(LockError::io(path, e)),
        }
    }
    Ok(true)
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.file.take());
        // New waiters clone the entry under the table lock, so holding it here
        // makes the reference count check race-free.
        let mut table = self.table.lock();
        drop(self.guard.take());
        let idle = table
            .get(&self.key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1);
        if idle {
            table.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn exclusive_under_contention(instances: Vec<KeyedLocks>) -> usize {
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let id = DeploymentId::new("d1");

        let mut handles = Vec::new();
        for i in 0..8 {
            let locks = instances[i % instances.len()].clone();
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(LockKey::deployment(&id)).await.unwrap();
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        assert_eq!(exclusive_under_contention(vec![locks.clone()]).await, 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(LockKey::host("a.example.com")).await.unwrap();
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock(LockKey::host("b.example.com")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entries_are_released_after_use() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.lock(LockKey::host("a.example.com")).await.unwrap();
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn separate_tables_exclude_each_other_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = KeyedLocks::shared(dir.path()).await.unwrap();
        let b = KeyedLocks::shared(dir.path()).await.unwrap();
        assert_eq!(exclusive_under_contention(vec![a, b]).await, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn file_lock_blocks_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let a = KeyedLocks::shared(dir.path()).await.unwrap();
        let b = KeyedLocks::shared(dir.path()).await.unwrap();

        let held = a.lock(LockKey::host("demo.example.com")).await.unwrap();
        let path = dir.path().join(LockKey::host("demo.example.com").file_name());
        let info: LockInfo =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(info.pid, std::process::id());

        let waiting = tokio::time::timeout(
            Duration::from_millis(200),
            b.lock(LockKey::host("demo.example.com")),
        )
        .await;
        assert!(waiting.is_err(), "second table must wait for the file");

        drop(held);
        assert!(!path.exists());
        tokio::time::timeout(Duration::from_secs(2), b.lock(LockKey::host("demo.example.com")))
            .await
            .expect("released lock should be acquirable")
            .unwrap();
    }

    #[tokio::test]
    async fn stale_and_unreadable_files_are_broken() {
        let dir = tempfile::tempdir().unwrap();
        let locks = KeyedLocks::shared(dir.path()).await.unwrap();

        let key = LockKey::deployment(&DeploymentId::new("old"));
        let stale = LockInfo {
            pid: std::process::id(),
            key: key.to_string(),
            acquired_at: Utc::now() - chrono::Duration::hours(2),
        };
        std::fs::write(
            dir.path().join(key.file_name()),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join(LockKey::ports().file_name()), "{garbage").unwrap();

        let acquire = async {
            let _a = locks.lock(key.clone()).await.unwrap();
            let _b = locks.lock(LockKey::ports()).await.unwrap();
        };
        tokio::time::timeout(Duration::from_secs(2), acquire)
            .await
            .expect("stale locks should not block");
    }

    #[test]
    fn fresh_lock_is_not_stale() {
        assert!(!LockInfo::current(&LockKey::ports()).is_stale());
    }

    #[test]
    fn lock_file_names_are_path_safe() {
        let key = LockKey::deployment(&DeploymentId::new("../etc/passwd"));
        assert!(!key.file_name().contains('/'));
    }
}
