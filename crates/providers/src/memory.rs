//! In-memory [`FileStore`] speaking the same create-or-update protocol
//! as the hosted API (compare-and-swap on the revision token). Backs
//! tests and offline demos.

use crate::{Commit, FileStore, ProviderError, RemoteFile};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<String, StoredFile>>,
    commits: Mutex<Vec<Commit>>,
    revisions: AtomicU64,
}

struct StoredFile {
    content: String,
    sha: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sha(&self) -> String {
        format!("rev-{}", self.revisions.fetch_add(1, Ordering::Relaxed))
    }

    /// Remote-side mutation: replaces content directly and bumps the
    /// revision, exactly like a second concurrent writer would.
    pub fn insert(&self, path: &str, content: &str) {
        let sha = self.next_sha();
        self.files.lock().expect("store lock poisoned").insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                sha,
            },
        );
    }

    pub fn latest_sha(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .expect("store lock poisoned")
            .get(path)
            .map(|f| f.sha.clone())
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .expect("store lock poisoned")
            .get(path)
            .map(|f| f.content.clone())
    }

    /// Number of writes accepted through the protocol.
    pub fn write_count(&self) -> usize {
        self.commits.lock().expect("store lock poisoned").len()
    }

    /// The hosted API's create-or-update primitive. An update whose
    /// token does not match the stored revision is rejected; a create
    /// against an existing path is rejected the same way.
    pub fn write_with_sha(
        &self,
        path: &str,
        content: &str,
        sha: Option<&str>,
        message: &str,
    ) -> Result<(), ProviderError> {
        let mut files = self.files.lock().expect("store lock poisoned");
        match (files.get(path), sha) {
            (Some(existing), Some(sha)) if existing.sha != sha => {
                return Err(ProviderError::Conflict)
            }
            (Some(_), None) | (None, Some(_)) => return Err(ProviderError::Conflict),
            _ => {}
        }
        let new_sha = self.next_sha();
        files.insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                sha: new_sha.clone(),
            },
        );
        self.commits
            .lock()
            .expect("store lock poisoned")
            .push(Commit {
                sha: new_sha,
                message: message.to_string(),
                author: "memory".to_string(),
                date: String::new(),
            });
        Ok(())
    }
}

#[async_trait::async_trait]
impl FileStore for MemoryStore {
    async fn list_md_files(&self) -> Result<Vec<RemoteFile>, ProviderError> {
        Ok(self
            .files
            .lock()
            .expect("store lock poisoned")
            .iter()
            .filter(|(path, _)| path.ends_with(".md"))
            .map(|(path, f)| RemoteFile {
                path: path.clone(),
                size: f.content.len() as u64,
                sha: f.sha.clone(),
            })
            .collect())
    }

    async fn read_file(&self, path: &str, _fresh: bool) -> Result<String, ProviderError> {
        self.content(path).ok_or(ProviderError::NotFound)
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), ProviderError> {
        // Same discipline as the real client: fresh token read, then
        // submit with it.
        let sha = self.latest_sha(path);
        self.write_with_sha(path, content, sha.as_deref(), message)
    }

    async fn recent_commits(&self, n: u32) -> Result<Vec<Commit>, ProviderError> {
        Ok(self
            .commits
            .lock()
            .expect("store lock poisoned")
            .iter()
            .rev()
            .take(n as usize)
            .cloned()
            .collect())
    }

    fn clear_cache(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_update_bumps_revision() {
        let store = MemoryStore::new();
        store.write_file("Home.md", "# Home\n", "init").await.unwrap();
        let first = store.latest_sha("Home.md").unwrap();
        store
            .write_file("Home.md", "# Home\n\nmore\n", "edit")
            .await
            .unwrap();
        assert_ne!(store.latest_sha("Home.md").unwrap(), first);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn stale_token_is_rejected_not_overwritten() {
        let store = MemoryStore::new();
        store.insert("Home.md", "original");
        let stale = store.latest_sha("Home.md").unwrap();
        // A second writer lands between token fetch and submit.
        store.insert("Home.md", "concurrent edit");
        let err = store
            .write_with_sha("Home.md", "mine", Some(&stale), "msg")
            .unwrap_err();
        assert!(matches!(err, ProviderError::Conflict));
        assert_eq!(store.content("Home.md").unwrap(), "concurrent edit");
    }

    #[tokio::test]
    async fn missing_file_reads_as_not_found() {
        let store = MemoryStore::new();
        let err = store.read_file("Memos.md", true).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound));
    }
}
