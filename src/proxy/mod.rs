// ABOUTME: Reverse-proxy configuration for deployments.
// ABOUTME: Traefik labels at build time and an optional Caddyfile refreshed after changes.

pub mod caddy;
pub mod traefik;

use crate::config::ProxyConfig;
use crate::deployment::{Deployment, DeploymentState};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

/// Public host routed to a local port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub host: String,
    pub port: u16,
}

impl RoutingRule {
    pub fn for_deployment(deployment: &Deployment) -> Self {
        Self {
            host: deployment.host().to_string(),
            port: deployment.host_port(),
        }
    }
}

/// Rules for every deployment currently serving traffic, sorted by host.
pub fn routing_rules(deployments: &[Deployment]) -> Vec<RoutingRule> {
    let mut rules: Vec<RoutingRule> = deployments
        .iter()
        .filter(|d| d.state() == DeploymentState::Deployed)
        .map(RoutingRule::for_deployment)
        .collect();
    rules.sort_by(|a, b| a.host.cmp(&b.host));
    rules
}

#[derive(Debug, Clone)]
pub struct ProxyConfigurator {
    entrypoints: String,
    caddyfile: Option<PathBuf>,
    preamble: Option<String>,
}

impl ProxyConfigurator {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            entrypoints: config.entrypoints.clone(),
            caddyfile: config.caddyfile.clone(),
            preamble: config.caddyfile_preamble.clone(),
        }
    }

    /// Labels routing `host` to `internal_port` inside the container.
    pub fn labels_for(&self, host: &str, internal_port: u16) -> HashMap<String, String> {
        traefik::labels(host, internal_port, &self.entrypoints)
    }

    /// Rewrite the Caddyfile from the current set of deployments.
    ///
    /// Returns `false` when no Caddyfile is configured.
    pub async fn refresh(&self, deployments: &[Deployment]) -> io::Result<bool> {
        let Some(path) = &self.caddyfile else {
            return Ok(false);
        };
        let rules = routing_rules(deployments);
        let content = caddy::render(self.preamble.as_deref(), &rules);
        caddy::write_atomic(path, &content).await?;
        tracing::debug!(path = %path.display(), routes = rules.len(), "Caddyfile refreshed");
        Ok(true)
    }
}
