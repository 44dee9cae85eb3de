//! Storage layer: client-local persistent state.
//!
//! JSON files standing in for the browser-local storage of the original
//! dashboard: the settings struct and the bounded notification log.

pub mod models;

use models::{Notification, Settings};
use std::fs;
use std::path::PathBuf;

/// Most-recent entries kept in the notification log; older ones drop off.
pub const NOTIFICATION_CAP: usize = 50;

const SETTINGS_FILE: &str = "settings.json";
const NOTIFICATIONS_FILE: &str = "notifications.json";

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Opens (creating if needed) the state directory.
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// A missing settings file reads as defaults, not an error.
    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let path = self.path(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(settings)?;
        fs::write(self.path(SETTINGS_FILE), raw)?;
        Ok(())
    }

    /// Prepends a notification, dropping the oldest past the cap.
    pub fn push_notification(&self, notification: Notification) -> anyhow::Result<()> {
        let mut log = self.notifications()?;
        log.insert(0, notification);
        log.truncate(NOTIFICATION_CAP);
        let raw = serde_json::to_string_pretty(&log)?;
        fs::write(self.path(NOTIFICATIONS_FILE), raw)?;
        Ok(())
    }

    /// Newest first.
    pub fn notifications(&self) -> anyhow::Result<Vec<Notification>> {
        let path = self.path(NOTIFICATIONS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_settings_file_reads_as_defaults() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let settings = store.load_settings().unwrap();
        assert!(settings.token.is_empty());
        assert!(settings.pinned_notes.is_empty());
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let mut settings = Settings::default();
        settings.token = "ghp_x".into();
        settings.repo = "swamp/vault".into();
        settings.webhook_url = "https://discord.example/hook".into();
        settings.pinned_notes.push("Home.md".into());
        settings
            .role_passwords
            .insert("admin".into(), "hunter2".into());
        store.save_settings(&settings).unwrap();

        let loaded = store.load_settings().unwrap();
        assert_eq!(loaded.repo, "swamp/vault");
        assert_eq!(loaded.pinned_notes, vec!["Home.md".to_string()]);
        assert_eq!(loaded.role_passwords["admin"], "hunter2");
    }

    #[test]
    fn notification_log_is_newest_first_and_capped() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        for i in 0..60 {
            store
                .push_notification(Notification {
                    title: format!("event {i}"),
                    detail: String::new(),
                    time: String::new(),
                })
                .unwrap();
        }
        let log = store.notifications().unwrap();
        assert_eq!(log.len(), NOTIFICATION_CAP);
        assert_eq!(log[0].title, "event 59");
        assert_eq!(log.last().unwrap().title, "event 10");
    }
}
