//! The facade the UI layer drives. Wraps a [`FileStore`] with the
//! extractors, the aggregate queries, and the post-write notification
//! glue.

use crate::daily;
use crate::error::VaultError;
use crate::memos;
use crate::models::{
    HealthReport, MemoEntry, ProjectGroup, SearchHit, TodoItem, VaultStats,
};
use crate::notify::Notifier;
use crate::queries;
use crate::todos;
use chrono::Local;
use providers::{Commit, FileStore, ProviderError, RemoteFile};
use std::sync::Arc;

pub struct Vault {
    store: Arc<dyn FileStore>,
    notifier: Notifier,
}

impl Vault {
    pub fn new(store: Arc<dyn FileStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    pub async fn list_md_files(&self) -> Result<Vec<RemoteFile>, VaultError> {
        Ok(self.store.list_md_files().await?)
    }

    pub async fn read_file(&self, path: &str, fresh: bool) -> Result<String, VaultError> {
        Ok(self.store.read_file(path, fresh).await?)
    }

    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), VaultError> {
        Ok(self.store.write_file(path, content, message).await?)
    }

    pub async fn get_stats(&self) -> Result<VaultStats, VaultError> {
        let files = self.store.list_md_files().await?;
        Ok(queries::stats(&files))
    }

    pub async fn get_todos(&self) -> Result<Vec<TodoItem>, VaultError> {
        todos::collect_todos(self.store.as_ref()).await
    }

    pub async fn get_projects(&self) -> Result<Vec<ProjectGroup>, VaultError> {
        let files = self.store.list_md_files().await?;
        Ok(queries::project_groups(&files))
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, VaultError> {
        queries::search(self.store.as_ref(), keyword).await
    }

    pub async fn health_check(&self) -> Result<HealthReport, VaultError> {
        let files = self.store.list_md_files().await?;
        Ok(queries::health_check(&files, Local::now().date_naive()))
    }

    pub async fn get_commits(&self, n: u32) -> Result<Vec<Commit>, VaultError> {
        Ok(self.store.recent_commits(n).await?)
    }

    pub fn clear_cache(&self) {
        self.store.clear_cache();
    }

    pub async fn add_todo(&self, project: &str, task: &str) -> Result<String, VaultError> {
        let path =
            todos::add_todo(self.store.as_ref(), project, task, self.notifier.actor()).await?;
        self.notifier.record("TODO added", task.trim()).await;
        Ok(path)
    }

    pub async fn toggle_todo(&self, item: &TodoItem) -> Result<(), VaultError> {
        todos::toggle_todo(self.store.as_ref(), item, self.notifier.actor()).await?;
        let action = if item.done { "TODO reopened" } else { "TODO done" };
        self.notifier.record(action, &item.task).await;
        Ok(())
    }

    pub async fn delete_todo(&self, item: &TodoItem) -> Result<(), VaultError> {
        todos::delete_todo(self.store.as_ref(), item, self.notifier.actor()).await?;
        self.notifier.record("TODO deleted", &item.task).await;
        Ok(())
    }

    /// A vault without a memo file yet lists as empty, not as an error.
    pub async fn list_memos(&self) -> Result<Vec<MemoEntry>, VaultError> {
        match self.store.read_file(memos::MEMOS_FILE, false).await {
            Ok(content) => Ok(memos::parse_memos(&content)),
            Err(ProviderError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn add_memo(&self, text: &str) -> Result<(), VaultError> {
        memos::add_memo(self.store.as_ref(), text, Local::now()).await?;
        self.notifier.record("Memo added", text.trim()).await;
        Ok(())
    }

    pub async fn delete_memo(&self, entry: &MemoEntry) -> Result<(), VaultError> {
        memos::delete_memo(self.store.as_ref(), &entry.raw_line).await?;
        self.notifier.record("Memo done", &entry.text).await;
        Ok(())
    }

    pub async fn add_quick_note(&self, text: &str) -> Result<String, VaultError> {
        let path = daily::add_quick_note(
            self.store.as_ref(),
            text,
            self.notifier.actor(),
            Local::now(),
        )
        .await?;
        self.notifier.record("Quick note", text.trim()).await;
        Ok(path)
    }
}
