use providers::gemini::GeminiConfig;
use providers::github::GithubConfig;
use serde::{Deserialize, Serialize};
use storage::models::Settings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub webhook: WebhookSection,
    #[serde(default)]
    pub local: LocalSection,
    #[serde(default)]
    pub user: UserSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubSection {
    pub token: Option<String>,
    pub repo: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiSection {
    pub key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookSection {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalSection {
    /// Directory for settings and the notification log.
    pub state_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSection {
    pub name: Option<String>,
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

/// Fully resolved client configuration: the config file wins, stored
/// settings fill in whatever it leaves unset.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub github: GithubConfig,
    pub gemini: Option<GeminiConfig>,
    pub webhook_url: Option<String>,
    pub actor: Option<String>,
}

pub fn resolve(cfg: &AppConfig, stored: &Settings) -> anyhow::Result<ResolvedConfig> {
    let token = cfg
        .github
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| stored.token.clone());
    let repo = cfg
        .github
        .repo
        .clone()
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| stored.repo.clone());
    if token.is_empty() || repo.is_empty() {
        anyhow::bail!(
            "no repository credential configured; set github.token and github.repo \
             in the config file or via `config-set`"
        );
    }
    let mut github = GithubConfig::new(token, repo);
    if let Some(base) = cfg.github.base_url.clone().filter(|b| !b.is_empty()) {
        github.base_url = base;
    }

    let ai_key = cfg
        .ai
        .key
        .clone()
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| stored.ai_key.clone());
    let gemini = (!ai_key.is_empty()).then(|| {
        let mut g = GeminiConfig::new(ai_key);
        if let Some(model) = cfg.ai.model.clone().filter(|m| !m.is_empty()) {
            g.model = model;
        }
        g
    });

    let webhook_url = cfg
        .webhook
        .url
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| (!stored.webhook_url.is_empty()).then(|| stored.webhook_url.clone()));

    let actor = cfg
        .user
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| (!stored.user_name.is_empty()).then(|| stored.user_name.clone()));

    Ok(ResolvedConfig {
        github,
        gemini,
        webhook_url,
        actor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_settings_fill_unset_fields() {
        let cfg = AppConfig::default();
        let mut stored = Settings::default();
        stored.token = "ghp_stored".into();
        stored.repo = "swamp/vault".into();
        stored.webhook_url = "https://hook.example".into();
        let resolved = resolve(&cfg, &stored).unwrap();
        assert_eq!(resolved.github.token, "ghp_stored");
        assert_eq!(resolved.github.repo, "swamp/vault");
        assert_eq!(resolved.webhook_url.as_deref(), Some("https://hook.example"));
        assert!(resolved.gemini.is_none());
    }

    #[test]
    fn config_file_wins_over_stored_settings() {
        let mut cfg = AppConfig::default();
        cfg.github.token = Some("ghp_file".into());
        cfg.github.repo = Some("other/repo".into());
        cfg.ai.key = Some("ai_file".into());
        cfg.ai.model = Some("gemini-2.5-pro".into());
        let mut stored = Settings::default();
        stored.token = "ghp_stored".into();
        stored.repo = "swamp/vault".into();
        stored.ai_key = "ai_stored".into();
        let resolved = resolve(&cfg, &stored).unwrap();
        assert_eq!(resolved.github.token, "ghp_file");
        assert_eq!(resolved.github.repo, "other/repo");
        let gemini = resolved.gemini.unwrap();
        assert_eq!(gemini.api_key, "ai_file");
        assert_eq!(gemini.model, "gemini-2.5-pro");
    }

    #[test]
    fn missing_credential_is_an_error() {
        let err = resolve(&AppConfig::default(), &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("credential"));
    }
}
