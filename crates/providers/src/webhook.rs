//! Outbound webhook notifier. Delivery is best-effort: failures are
//! logged and swallowed, never surfaced to the mutation that triggered
//! them.

use reqwest::Client;

const EMBED_COLOR: u32 = 0x6366f1;

pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub async fn notify(&self, title: &str, detail: &str) {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let body = serde_json::json!({
            "embeds": [{
                "title": title,
                "description": detail,
                "color": EMBED_COLOR,
                "footer": { "text": format!("Vault Dashboard | {now}") }
            }]
        });
        match self.client.post(&self.url).json(&body).send().await {
            Ok(resp) if !resp.status().is_success() => {
                tracing::warn!(status = resp.status().as_u16(), "webhook delivery rejected");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "webhook delivery failed"),
        }
    }
}
