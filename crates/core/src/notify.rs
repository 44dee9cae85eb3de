//! Post-write glue: every successful mutation lands in the bounded
//! local notification log and, when configured, fans out to the
//! webhook. Neither path can fail the mutation that triggered it.

use providers::webhook::WebhookClient;
use storage::models::Notification;
use storage::LocalStore;

pub struct Notifier {
    webhook: Option<WebhookClient>,
    log: Option<LocalStore>,
    actor: Option<String>,
}

impl Notifier {
    pub fn new(
        webhook_url: Option<&str>,
        log: Option<LocalStore>,
        actor: Option<String>,
    ) -> Self {
        let webhook = webhook_url
            .filter(|u| !u.is_empty())
            .map(WebhookClient::new);
        Self { webhook, log, actor }
    }

    /// Disconnected notifier for contexts without persistence or hooks.
    pub fn disabled() -> Self {
        Self::new(None, None, None)
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub async fn record(&self, action: &str, detail: &str) {
        let title = match &self.actor {
            Some(a) => format!("{action} ({a})"),
            None => action.to_string(),
        };
        if let Some(log) = &self.log {
            let notification = Notification {
                title: title.clone(),
                detail: detail.to_string(),
                time: chrono::Local::now().to_rfc3339(),
            };
            if let Err(e) = log.push_notification(notification) {
                tracing::warn!(error = %e, "notification log write failed");
            }
        }
        if let Some(webhook) = &self.webhook {
            webhook.notify(&title, detail).await;
        }
    }
}
