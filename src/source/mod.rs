// ABOUTME: Fetching workload sources into a local build directory.
// ABOUTME: The fetcher trait, the git implementation and build descriptor parsing.

mod descriptor;
mod git;

pub use descriptor::{BuildDescriptor, DescriptorError, exposed_port};
pub use git::GitFetcher;

use crate::types::SourceRef;
use async_trait::async_trait;
use std::path::Path;

/// Errors from materializing a source tree.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch {source_ref}: {message}")]
    CloneFailed { source_ref: String, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Place the tree for `source` at `dest`, which must not exist yet.
    async fn materialize(&self, source: &SourceRef, dest: &Path) -> Result<(), FetchError>;
}
