// ABOUTME: Uniform result envelope for callers outside the crate.
// ABOUTME: Success flag, error kind, human message and optional payload.

use super::error::{ErrorKind, OperationError};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> Outcome<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            success: true,
            kind: None,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn failed(error: &OperationError) -> Self {
        Self {
            success: false,
            kind: Some(error.kind()),
            message: error.to_string(),
            payload: None,
        }
    }

    pub fn from_result(result: Result<T, OperationError>, message: impl Into<String>) -> Self {
        match result {
            Ok(payload) => Self::ok(message, payload),
            Err(e) => Self::failed(&e),
        }
    }
}
