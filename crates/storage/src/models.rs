use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Explicit configuration handed to client constructors. Persisted as a
/// whole; core logic never reads ambient state on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub token: String,
    /// `owner/name` repository identifier.
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub ai_key: String,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub role_passwords: HashMap<String, String>,
    #[serde(default)]
    pub pinned_notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub detail: String,
    /// RFC 3339 timestamp.
    pub time: String,
}
