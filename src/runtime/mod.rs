// ABOUTME: Container runtime abstraction for Docker and Podman.
// ABOUTME: Auto-detects the local runtime and exposes it through capability traits.

mod bollard;
mod context;
mod detection;
mod error;
mod traits;
mod types;

pub use self::bollard::{BollardRuntime, ConnectionError};
pub use context::pack_directory;
pub use detection::{DetectionError, detect_local, resolve};
pub use error::RuntimeError;
pub use traits::*;
pub use types::{RuntimeConfig, RuntimeInfo, RuntimeType};

/// Resolve, connect to and ping the configured runtime.
pub async fn connect(config: &RuntimeConfig) -> Result<BollardRuntime, RuntimeError> {
    let info = resolve(config)?;
    tracing::debug!(runtime = %info.runtime_type, socket = %info.socket_path, "connecting to container runtime");
    let runtime = BollardRuntime::connect(&info)?;
    runtime.ping().await?;
    Ok(runtime)
}
