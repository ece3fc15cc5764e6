// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Build images from a source directory and remove them.

use super::shared_types::BuildRequest;
use crate::types::ImageId;
use async_trait::async_trait;

/// Image operations: build, remove.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Build an image from a local context directory.
    async fn build_image(&self, request: &BuildRequest) -> Result<ImageId, ImageError>;

    /// Remove an image.
    async fn remove_image(&self, image: &ImageId, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("build context unreadable: {0}")]
    Context(String),

    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
