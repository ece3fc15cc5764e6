// ABOUTME: Bounded worker pool for blocking runtime calls.
// ABOUTME: A shared permit pool caps runtime work; a smaller one caps concurrent image builds.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Errors from running a task on the pool.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker pool is closed")]
    Closed,

    #[error("{task} worker panicked")]
    Panicked { task: &'static str },

    #[error("{task} worker was cancelled")]
    Cancelled { task: &'static str },
}

/// Runs runtime operations on spawned tasks, never more than `workers` at once.
///
/// Builds take an extra permit from a separate, smaller pool so a burst of
/// deploys cannot starve stops, restarts and health checks.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: Arc<Semaphore>,
    builds: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(workers: usize, builds: usize) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(workers.max(1))),
            builds: Arc::new(Semaphore::new(builds.max(1))),
        }
    }

    /// Run `task` on the pool and wait for its output.
    pub async fn run<F, T>(&self, name: &'static str, task: F) -> Result<T, WorkerError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;

        let handle = tokio::spawn(async move {
            let output = task.await;
            drop(permit);
            output
        });

        handle.await.map_err(|e| {
            if e.is_panic() {
                tracing::error!("{} worker panicked", name);
                WorkerError::Panicked { task: name }
            } else {
                WorkerError::Cancelled { task: name }
            }
        })
    }

    /// Run an image build, holding a build permit for its whole duration.
    pub async fn run_build<F, T>(&self, name: &'static str, task: F) -> Result<T, WorkerError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let _build = Arc::clone(&self.builds)
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;
        self.run(name, task).await
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(16, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn returns_task_output() {
        let pool = WorkerPool::new(2, 1);
        assert_eq!(pool.run("add", async { 1 + 1 }).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn panics_surface_as_errors() {
        let pool = WorkerPool::new(1, 1);
        let result = pool
            .run("explode", async {
                panic!("boom");
            })
            .await;
        assert!(matches!(result, Err(WorkerError::Panicked { task: "explode" })));

        // The panicked task gave its permit back.
        let next = tokio::time::timeout(Duration::from_secs(1), pool.run("after", async { 7 }))
            .await
            .expect("permit should be released");
        assert_eq!(next.unwrap(), 7);
    }

    #[tokio::test]
    async fn builds_are_capped_separately() {
        let pool = WorkerPool::new(8, 2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                pool.run_build("build", async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
