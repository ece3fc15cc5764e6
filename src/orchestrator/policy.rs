// ABOUTME: Per-mode deployment policy: host naming and who hears about changes.
// ABOUTME: Preview and production share one workflow and differ only here.

use crate::deployment::{Deployment, DeploymentMode};
use crate::notify::{Audience, Notice};
use crate::types::Subdomain;
use std::sync::Arc;

pub trait ModePolicy: Send + Sync + std::fmt::Debug {
    fn mode(&self) -> DeploymentMode;

    /// Public host for `subdomain` under `domain`.
    fn host_for(&self, subdomain: &Subdomain, domain: &str) -> String;

    fn deployed_notices(&self, deployment: &Deployment) -> Vec<Notice> {
        vec![operator_notice(deployment)]
    }

    fn deleted_notices(&self, _deployment: &Deployment) -> Vec<Notice> {
        Vec::new()
    }
}

fn operator_notice(deployment: &Deployment) -> Notice {
    let mode = deployment.mode();
    Notice {
        audience: Audience::Operators,
        username: format!("Voyager {} deployment", mode),
        title: format!("New {} deployment", mode),
        url: Some(deployment.url()),
        description: format!("A new {} deployment has been created.", mode),
        fields: vec![
            ("Deployment Key".to_string(), deployment.id().to_string()),
            ("Port".to_string(), deployment.host_port().to_string()),
            ("Docker Container".to_string(), deployment.container_id().to_string()),
        ],
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewPolicy;

impl ModePolicy for PreviewPolicy {
    fn mode(&self) -> DeploymentMode {
        DeploymentMode::Preview
    }

    fn host_for(&self, subdomain: &Subdomain, domain: &str) -> String {
        format!("{}-preview.{}", subdomain, domain)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductionPolicy;

impl ModePolicy for ProductionPolicy {
    fn mode(&self) -> DeploymentMode {
        DeploymentMode::Production
    }

    fn host_for(&self, subdomain: &Subdomain, domain: &str) -> String {
        format!("{}.{}", subdomain, domain)
    }

    fn deployed_notices(&self, deployment: &Deployment) -> Vec<Notice> {
        vec![
            operator_notice(deployment),
            Notice {
                audience: Audience::Clients,
                username: "Voyager".to_string(),
                title: "Your deployment is live".to_string(),
                url: Some(deployment.url()),
                description: format!("{} is now serving traffic.", deployment.host()),
                fields: Vec::new(),
            },
        ]
    }

    fn deleted_notices(&self, deployment: &Deployment) -> Vec<Notice> {
        vec![Notice {
            audience: Audience::Clients,
            username: "Voyager".to_string(),
            title: "Deployment removed".to_string(),
            url: None,
            description: format!("{} is no longer being served.", deployment.host()),
            fields: vec![("Deployment Key".to_string(), deployment.id().to_string())],
        }]
    }
}

pub fn policy_for(mode: DeploymentMode) -> Arc<dyn ModePolicy> {
    match mode {
        DeploymentMode::Preview => Arc::new(PreviewPolicy),
        DeploymentMode::Production => Arc::new(ProductionPolicy),
    }
}
