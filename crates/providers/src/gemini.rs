//! AI completion client. The only operation with automatic retry: a
//! 429 backs off exponentially from 2s, up to three retries.

use crate::{map_status, CompletionProvider, ProviderError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

pub struct GeminiClient {
    client: Client,
    cfg: GeminiConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(cfg: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            cfg,
        }
    }
}

fn build_request(prompt: &str, context: Option<&str>) -> serde_json::Value {
    let system = match context {
        Some(ctx) => format!(
            "You are a helpful assistant for a personal knowledge vault. Context:\n{ctx}"
        ),
        None => "You are a helpful AI assistant.".to_string(),
    };
    serde_json::json!({
        "system_instruction": { "parts": [{ "text": system }] },
        "contents": [{ "parts": [{ "text": prompt }] }]
    })
}

#[async_trait::async_trait]
impl CompletionProvider for GeminiClient {
    async fn ask(&self, prompt: &str, context: Option<&str>) -> Result<String, ProviderError> {
        if self.cfg.api_key.is_empty() {
            return Err(ProviderError::Validation(
                "completion API key is not configured".into(),
            ));
        }
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.cfg.base_url, self.cfg.model, self.cfg.api_key
        );
        let body = build_request(prompt, context);

        let mut delay = INITIAL_BACKOFF;
        for attempt in 0..=MAX_RETRIES {
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
            let status = resp.status();

            if status.as_u16() == 429 && attempt < MAX_RETRIES {
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "completion API rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(map_status(status.as_u16(), &text));
            }

            let parsed: GenerateResponse = resp
                .json()
                .await
                .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
            let reply = parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content.parts.into_iter().next())
                .map(|p| p.text)
                .filter(|t| !t.is_empty());
            return reply
                .ok_or_else(|| ProviderError::Validation("empty completion response".into()));
        }
        Err(ProviderError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_embeds_context_in_system_instruction() {
        let body = build_request("what is pending?", Some("## TODO\n- [ ] ship"));
        let system = body["system_instruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(system.contains("- [ ] ship"));
        assert_eq!(
            body["contents"][0]["parts"][0]["text"].as_str().unwrap(),
            "what is pending?"
        );
    }

    #[test]
    fn request_without_context_uses_plain_system_prompt() {
        let body = build_request("hello", None);
        let system = body["system_instruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(!system.contains("Context:"));
    }

    #[test]
    fn reply_text_comes_from_first_candidate() {
        let data = serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "first" }, { "text": "second" }] } },
                { "content": { "parts": [{ "text": "other" }] } }
            ]
        });
        let parsed: GenerateResponse = serde_json::from_value(data).unwrap();
        let reply = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text);
        assert_eq!(reply.as_deref(), Some("first"));
    }
}
