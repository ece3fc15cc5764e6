// ABOUTME: Build descriptor inspection.
// ABOUTME: Finds the internal port a workload listens on from its EXPOSE instruction.

use std::path::{Path, PathBuf};

/// Problems with the workload's build descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("build descriptor not found at {0}")]
    Missing(PathBuf),

    #[error("failed to read build descriptor {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build descriptor declares no EXPOSE port")]
    NoExposedPort,

    #[error("invalid EXPOSE port: {0}")]
    InvalidPort(String),
}

/// The build descriptor of a materialized source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    pub file_name: String,
    pub internal_port: u16,
}

impl BuildDescriptor {
    pub async fn load(dir: &Path, file_name: &str) -> Result<Self, DescriptorError> {
        let path = dir.join(file_name);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DescriptorError::Missing(path));
            }
            Err(source) => return Err(DescriptorError::Unreadable { path, source }),
        };

        Ok(Self {
            file_name: file_name.to_string(),
            internal_port: exposed_port(&content)?,
        })
    }
}

/// The first port named by an `EXPOSE` instruction.
pub fn exposed_port(content: &str) -> Result<u16, DescriptorError> {
    for line in content.lines() {
        let mut words = line.split_whitespace();
        let Some(instruction) = words.next() else {
            continue;
        };
        if !instruction.eq_ignore_ascii_case("EXPOSE") {
            continue;
        }
        let Some(port) = words.next() else {
            continue;
        };
        let number = port.split('/').next().unwrap_or(port);
        return match number.parse::<u16>() {
            Ok(0) | Err(_) => Err(DescriptorError::InvalidPort(port.to_string())),
            Ok(port) => Ok(port),
        };
    }
    Err(DescriptorError::NoExposedPort)
}
