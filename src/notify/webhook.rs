// ABOUTME: Discord-compatible webhook notifier.
// ABOUTME: Routes notices to an operator or client webhook as a single embed.

use super::{Audience, Notice, Notifier, NotifyError};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    operators: Option<String>,
    clients: Option<String>,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Webhook URLs embed their secret.
        f.debug_struct("WebhookNotifier")
            .field("operators", &self.operators.is_some())
            .field("clients", &self.clients.is_some())
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    username: &'a str,
    embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    description: &'a str,
    fields: Vec<EmbedField<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

impl WebhookNotifier {
    pub fn new(operators: Option<String>, clients: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            operators,
            clients,
        }
    }

    fn url_for(&self, audience: Audience) -> Option<&str> {
        match audience {
            Audience::Operators => self.operators.as_deref(),
            Audience::Clients => self.clients.as_deref(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        let Some(url) = self.url_for(notice.audience) else {
            tracing::debug!(audience = ?notice.audience, "no webhook configured; skipping notice");
            return Ok(());
        };

        let message = WebhookMessage {
            username: &notice.username,
            embeds: [Embed {
                title: &notice.title,
                url: notice.url.as_deref(),
                description: &notice.description,
                fields: notice
                    .fields
                    .iter()
                    .map(|(name, value)| EmbedField {
                        name,
                        value,
                        inline: true,
                    })
                    .collect(),
            }],
        };

        let response = self
            .client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
