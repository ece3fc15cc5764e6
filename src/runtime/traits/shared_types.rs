// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: BuildRequest, ContainerConfig, ContainerInfo and port mappings.

use crate::types::{ContainerId, ImageId};
use std::collections::HashMap;
use std::path::PathBuf;

/// Build an image from a directory containing a build descriptor.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Tag to apply to the built image.
    pub tag: String,
    /// Directory sent to the runtime as build context.
    pub context_dir: PathBuf,
    /// Descriptor file name, relative to `context_dir`.
    pub dockerfile: String,
    /// Labels baked into the image (and inherited by its containers).
    pub labels: HashMap<String, String>,
}

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Name for the container.
    pub name: String,
    /// Image to run.
    pub image: ImageId,
    /// Labels to apply.
    pub labels: HashMap<String, String>,
    /// Port mappings (host:container).
    pub ports: Vec<PortMapping>,
}

/// Port mapping configuration.
#[derive(Debug, Clone)]
pub struct PortMapping {
    /// Host port.
    pub host_port: Option<u16>,
    /// Container port.
    pub container_port: u16,
    /// Protocol (tcp/udp).
    pub protocol: Protocol,
    /// Host IP to bind to.
    pub host_ip: Option<String>,
}

impl PortMapping {
    /// Publish a TCP container port on a specific host port, all interfaces.
    pub fn tcp(host_port: u16, container_port: u16) -> Self {
        Self {
            host_port: Some(host_port),
            container_port,
            protocol: Protocol::Tcp,
            host_ip: None,
        }
    }
}

/// Network protocol.
#[derive(Debug, Clone, Copy, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

/// Information about a container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Container ID.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
    /// Image used.
    pub image: String,
    /// Current state.
    pub state: ContainerState,
    /// Labels.
    pub labels: HashMap<String, String>,
}

/// Container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}
