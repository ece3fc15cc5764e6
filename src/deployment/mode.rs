// ABOUTME: Deployment mode: preview or production.
// ABOUTME: Parsed from CLI input and stored lowercase in records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    Preview,
    Production,
}

impl DeploymentMode {
    pub const ALL: [DeploymentMode; 2] = [DeploymentMode::Preview, DeploymentMode::Production];

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentMode::Preview => "preview",
            DeploymentMode::Production => "production",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown deployment mode '{0}' (expected preview or production)")]
pub struct ParseModeError(String);

impl FromStr for DeploymentMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preview" => Ok(DeploymentMode::Preview),
            "production" | "prod" => Ok(DeploymentMode::Production),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}
