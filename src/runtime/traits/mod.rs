// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ImageOps, ContainerOps, LogOps and the combined Runtime.

mod container;
mod image;
mod logs;
mod shared_types;

pub use container::{ContainerError, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use logs::{LogError, LogLine, LogOps, LogOptions, LogStream, LogStreamResult};
pub use shared_types::*;

/// Everything the orchestrator needs from a container runtime.
pub trait Runtime: ImageOps + ContainerOps + LogOps {}

impl<T: ImageOps + ContainerOps + LogOps> Runtime for T {}
