// ABOUTME: Host port allocation for new containers.
// ABOUTME: Probes the OS for a free port, skipping ports owned by records or in-flight deploys.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("failed to probe for a free port: {0}")]
    Probe(#[from] std::io::Error),

    #[error("no usable host port after {0} attempts")]
    Exhausted(u32),
}

/// Hands out host ports, remembering the ones claimed by deploys still in progress.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    reserved: Arc<Mutex<HashSet<u16>>>,
    attempts: u32,
}

/// A port held for one in-flight deploy; released on drop.
#[derive(Debug)]
pub struct PortReservation {
    port: u16,
    reserved: Arc<Mutex<HashSet<u16>>>,
}

impl PortReservation {
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortReservation {
    fn drop(&mut self) {
        self.reserved.lock().remove(&self.port);
    }
}

impl PortAllocator {
    pub fn new(attempts: u32) -> Self {
        Self {
            reserved: Arc::default(),
            attempts: attempts.max(1),
        }
    }

    /// Reserve a free port that is not in `taken`.
    pub async fn reserve(&self, taken: &HashSet<u16>) -> Result<PortReservation, PortError> {
        for _ in 0..self.attempts {
            let port = probe_free_port().await?;
            if taken.contains(&port) {
                tracing::debug!(port, "probed port belongs to an existing deployment; retrying");
                continue;
            }
            if self.reserved.lock().insert(port) {
                return Ok(PortReservation {
                    port,
                    reserved: Arc::clone(&self.reserved),
                });
            }
        }
        Err(PortError::Exhausted(self.attempts))
    }
}

/// Ask the OS for an unused TCP port on the loopback interface.
pub async fn probe_free_port() -> std::io::Result<u16> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}
