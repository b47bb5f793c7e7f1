//! Release announcement sinks.

use super::operations::{Notification, Notifier};
use crate::error::{ForgeError, Result};
use reqwest::Client;

/// Writes the announcement to the log only
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        log::info!(
            "Released {} ({}) for {}{}",
            notification.name,
            notification.tag,
            notification.repository,
            notification
                .url
                .as_deref()
                .map(|u| format!(" at {}", u))
                .unwrap_or_default()
        );
        Ok(())
    }
}

/// POSTs the announcement as JSON to a webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

impl Notifier for WebhookNotifier {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| ForgeError::Transport {
                operation: "notify_webhook".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForgeError::Api {
                operation: "notify_webhook".to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        log::debug!("Webhook notified for {}", notification.tag);
        Ok(())
    }
}

/// Notifier selected at startup
#[derive(Debug, Clone)]
pub enum NotifySink {
    /// Log only
    Log(LogNotifier),
    /// Log, then POST to a webhook
    Webhook(WebhookNotifier),
}

impl NotifySink {
    /// Webhook sink when a URL is configured, log sink otherwise
    pub fn from_url(url: Option<&str>) -> Self {
        match url {
            Some(url) => NotifySink::Webhook(WebhookNotifier::new(url)),
            None => NotifySink::Log(LogNotifier),
        }
    }
}

impl Notifier for NotifySink {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        LogNotifier.publish(notification).await?;
        match self {
            NotifySink::Log(_) => Ok(()),
            NotifySink::Webhook(webhook) => webhook.publish(notification).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_selection() {
        assert!(matches!(NotifySink::from_url(None), NotifySink::Log(_)));
        assert!(matches!(
            NotifySink::from_url(Some("https://hooks.example/x")),
            NotifySink::Webhook(_)
        ));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let notification = Notification {
            repository: "o/r".into(),
            name: "Build 3 (main)".into(),
            tag: "main-3".into(),
            url: None,
            body: String::new(),
            prerelease: false,
            assets: vec![],
        };
        assert!(LogNotifier.publish(&notification).await.is_ok());
    }
}
