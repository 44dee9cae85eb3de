//! Client for the Git-hosting content API. Sole owner of the response
//! cache and of revision-token handling for safe overwrites.

use crate::cache::{Clock, ResponseCache, SystemClock, RESPONSE_TTL};
use crate::{map_status, Commit, FileStore, ProviderError, RemoteFile};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{header, Client};
use serde::Deserialize;
use std::sync::Arc;

const ACCEPT: &str = "application/vnd.github.v3+json";
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Tooling folders excluded from every listing.
const SKIP_FOLDERS: &[&str] = &[
    ".obsidian",
    "exports",
    "scripts",
    ".git",
    "__pycache__",
    ".github",
    "node_modules",
];

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: String,
    /// `owner/name` repository identifier.
    pub repo: String,
    pub base_url: String,
}

impl GithubConfig {
    pub fn new(token: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            repo: repo.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub struct GithubClient {
    client: Client,
    cfg: GithubConfig,
    cache: ResponseCache,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    sha: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    sha: String,
}

#[derive(Deserialize)]
struct CommitEntry {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: String,
}

impl GithubClient {
    pub fn new(cfg: GithubConfig) -> Self {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: GithubConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client: Client::new(),
            cfg,
            cache: ResponseCache::new(RESPONSE_TTL, clock),
        }
    }

    fn url(&self, api_path: &str) -> String {
        format!("{}/repos/{}/{}", self.cfg.base_url, self.cfg.repo, api_path)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(header::AUTHORIZATION, format!("token {}", self.cfg.token))
            .header(header::ACCEPT, ACCEPT)
    }

    async fn into_json(resp: reqwest::Response) -> Result<serde_json::Value, ProviderError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "content API request failed");
            return Err(map_status(status.as_u16(), &body));
        }
        resp.json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }

    /// Cached GET keyed by the full resolved URL.
    async fn get_json(&self, api_path: &str) -> Result<serde_json::Value, ProviderError> {
        let url = self.url(api_path);
        if let Some(hit) = self.cache.get(&url) {
            return Ok(hit);
        }
        let resp = self
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let data = Self::into_json(resp).await?;
        self.cache.put(&url, data.clone());
        Ok(data)
    }

    /// Cache-defeating GET: a nonce query parameter plus `no-store`
    /// keep intermediaries from answering, and the result is never
    /// stored locally. Used for every read that feeds a write.
    async fn get_json_fresh(&self, api_path: &str) -> Result<serde_json::Value, ProviderError> {
        let url = self.url(api_path);
        let nonce = chrono::Utc::now().timestamp_millis();
        let resp = self
            .get(&url)
            .query(&[("t", nonce.to_string())])
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Self::into_json(resp).await
    }

    /// Recursive blob listing of the default branch.
    pub async fn get_tree(&self) -> Result<Vec<RemoteFile>, ProviderError> {
        let data = self.get_json("git/trees/main?recursive=1").await?;
        let parsed: TreeResponse =
            serde_json::from_value(data).map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(parsed
            .tree
            .into_iter()
            .filter(|e| e.kind == "blob")
            .map(|e| RemoteFile {
                path: e.path,
                size: e.size,
                sha: e.sha,
            })
            .collect())
    }

    pub async fn list_md_files(&self) -> Result<Vec<RemoteFile>, ProviderError> {
        let tree = self.get_tree().await?;
        Ok(tree.into_iter().filter(|f| is_tracked_md(&f.path)).collect())
    }

    pub async fn read_file(&self, path: &str, fresh: bool) -> Result<String, ProviderError> {
        let (text, _sha) = self.read_file_with_sha(path, fresh).await?;
        Ok(text)
    }

    /// Decoded content plus the revision token needed to overwrite it.
    pub async fn read_file_with_sha(
        &self,
        path: &str,
        fresh: bool,
    ) -> Result<(String, String), ProviderError> {
        let api_path = format!("contents/{path}");
        let data = if fresh {
            self.get_json_fresh(&api_path).await?
        } else {
            self.get_json(&api_path).await?
        };
        let parsed: ContentsResponse =
            serde_json::from_value(data).map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok((decode_content(path, &parsed.content)?, parsed.sha))
    }

    /// Create-or-update. The revision token is fetched fresh immediately
    /// before the submit; an absent token means a new file. A stale
    /// token is rejected remotely and surfaces as `Conflict`.
    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), ProviderError> {
        let api_path = format!("contents/{path}");
        let sha = match self.get_json_fresh(&api_path).await {
            Ok(existing) => existing
                .get("sha")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            Err(ProviderError::NotFound) => None,
            Err(e) => return Err(e),
        };

        let message = if message.is_empty() {
            format!("Update {path}")
        } else {
            message.to_string()
        };
        let mut body = serde_json::json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha);
        }

        let resp = self
            .client
            .put(self.url(&api_path))
            .header(header::AUTHORIZATION, format!("token {}", self.cfg.token))
            .header(header::ACCEPT, ACCEPT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), path, "write rejected");
            return Err(map_status(status.as_u16(), &text));
        }
        // Every successful write invalidates all cached reads.
        self.cache.clear();
        Ok(())
    }

    pub async fn get_commits(&self, n: u32) -> Result<Vec<Commit>, ProviderError> {
        let data = self.get_json(&format!("commits?per_page={n}")).await?;
        let parsed: Vec<CommitEntry> =
            serde_json::from_value(data).map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(parsed
            .into_iter()
            .map(|c| {
                let author = c.commit.author.unwrap_or(CommitAuthor {
                    name: String::new(),
                    date: String::new(),
                });
                Commit {
                    sha: c.sha,
                    message: c.commit.message,
                    author: author.name,
                    date: author.date,
                }
            })
            .collect())
    }

    /// Fires a repository_dispatch event so remote automation can run a
    /// sync pass. Not cached, nothing to decode on success.
    pub async fn dispatch_sync(&self, event_type: &str) -> Result<(), ProviderError> {
        let resp = self
            .client
            .post(self.url("dispatches"))
            .header(header::AUTHORIZATION, format!("token {}", self.cfg.token))
            .header(header::ACCEPT, ACCEPT)
            .json(&serde_json::json!({ "event_type": event_type }))
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &body));
        }
        Ok(())
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[async_trait::async_trait]
impl FileStore for GithubClient {
    async fn list_md_files(&self) -> Result<Vec<RemoteFile>, ProviderError> {
        GithubClient::list_md_files(self).await
    }

    async fn read_file(&self, path: &str, fresh: bool) -> Result<String, ProviderError> {
        GithubClient::read_file(self, path, fresh).await
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), ProviderError> {
        GithubClient::write_file(self, path, content, message).await
    }

    async fn recent_commits(&self, n: u32) -> Result<Vec<Commit>, ProviderError> {
        self.get_commits(n).await
    }

    fn clear_cache(&self) {
        GithubClient::clear_cache(self)
    }
}

fn is_tracked_md(path: &str) -> bool {
    path.ends_with(".md") && !SKIP_FOLDERS.iter().any(|s| path.starts_with(s))
}

/// The transport wraps content in base64 with embedded newlines. Strip
/// the whitespace, decode, and interpret the bytes as UTF-8 so
/// multi-byte text round-trips exactly.
fn decode_content(path: &str, raw: &str) -> Result<String, ProviderError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ProviderError::RequestFailed(format!("content envelope for {path}: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| ProviderError::RequestFailed(format!("{path} is not valid UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_round_trips_multibyte_text() {
        let original = "# メモ\n\n- [ ] 日本語タスク 🎉\n";
        let encoded = STANDARD.encode(original.as_bytes());
        // The API wraps base64 at 60 columns; embed newlines to match.
        let wrapped: String = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(decode_content("Memos.md", &wrapped).unwrap(), original);
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let encoded = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert!(decode_content("x.md", &encoded).is_err());
    }

    #[test]
    fn listing_filter_excludes_reserved_folders() {
        assert!(is_tracked_md("Projects/alpha/alpha.md"));
        assert!(is_tracked_md("Home.md"));
        assert!(!is_tracked_md("Projects/alpha/notes.txt"));
        assert!(!is_tracked_md(".obsidian/workspace.md"));
        assert!(!is_tracked_md("scripts/deploy.md"));
        assert!(!is_tracked_md("node_modules/pkg/README.md"));
    }

    #[test]
    fn tree_response_keeps_blobs_only() {
        let data = json!({
            "tree": [
                { "path": "Home.md", "type": "blob", "size": 120, "sha": "aaa" },
                { "path": "Projects", "type": "tree", "sha": "bbb" },
                { "path": "Daily/2026-08-07.md", "type": "blob", "size": 40, "sha": "ccc" }
            ]
        });
        let parsed: TreeResponse = serde_json::from_value(data).unwrap();
        let blobs: Vec<_> = parsed.tree.into_iter().filter(|e| e.kind == "blob").collect();
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].path, "Home.md");
        assert_eq!(blobs[1].size, 40);
    }

    #[test]
    fn commit_entries_tolerate_missing_author() {
        let data = json!([
            { "sha": "abc", "commit": { "message": "Bot: memo" } },
            { "sha": "def", "commit": { "message": "Edit", "author": { "name": "swamp", "date": "2026-08-07T10:00:00Z" } } }
        ]);
        let parsed: Vec<CommitEntry> = serde_json::from_value(data).unwrap();
        assert!(parsed[0].commit.author.is_none());
        assert_eq!(parsed[1].commit.author.as_ref().unwrap().name, "swamp");
    }
}
