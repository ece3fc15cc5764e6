// ABOUTME: Config values that may come from environment variables.
// ABOUTME: Keeps secrets like API tokens out of the config file.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

/// Resolve an optional value; an unset variable without default reads as absent.
pub fn resolve_optional(value: Option<&EnvValue>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(value) => match value.resolve() {
            Ok(resolved) if resolved.is_empty() => Ok(None),
            Ok(resolved) => Ok(Some(resolved)),
            Err(Error::MissingEnvVar(_)) => Ok(None),
            Err(e) => Err(e),
        },
    }
}
