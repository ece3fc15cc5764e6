// ABOUTME: Fire-and-forget notifications about deployment lifecycle events.
// ABOUTME: Delivery runs detached; failures are logged and never reach the operation.

mod webhook;

pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Who a notice is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// The team running the platform.
    Operators,
    /// The owners of a production deployment.
    Clients,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub audience: Audience,
    pub username: String,
    pub title: String,
    pub url: Option<String>,
    pub description: String,
    pub fields: Vec<(String, String)>,
}

/// Errors from delivering a notice.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification endpoint rejected the message (HTTP {status})")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Notifier that drops everything.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _notice: &Notice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Deliver `notice` on a detached task.
pub fn dispatch(notifier: Arc<dyn Notifier>, notice: Notice) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&notice).await {
            tracing::warn!(title = %notice.title, "failed to deliver notification: {}", e);
        }
    });
}
