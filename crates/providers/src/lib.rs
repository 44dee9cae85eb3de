//! Clients for the vault's remote collaborators: the Git-hosting content
//! API, the AI completion API, and the outbound webhook.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cache;
pub mod gemini;
pub mod github;
pub mod memory;
pub mod webhook;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not found")]
    NotFound,
    #[error("write conflict: the remote revision changed, re-read and retry")]
    Conflict,
    #[error("unauthorized: credential rejected")]
    Unauthorized,
    #[error("rate limited")]
    RateLimited,
    #[error("validation: {0}")]
    Validation(String),
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("API {status}: {body}")]
    Unknown { status: u16, body: String },
}

/// One blob entry of a tree listing generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFile {
    pub path: String,
    pub size: u64,
    /// Revision token required for a safe overwrite of this file.
    pub sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

/// Seam between domain logic and the concrete content-API client.
///
/// Mutating operations perform their own fresh revision-token read
/// immediately before submitting, and clear the response cache on
/// success. A stale token surfaces as [`ProviderError::Conflict`].
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    async fn list_md_files(&self) -> Result<Vec<RemoteFile>, ProviderError>;

    /// Read decoded file content. `fresh` bypasses every cache layer and
    /// must be used for any read feeding a write.
    async fn read_file(&self, path: &str, fresh: bool) -> Result<String, ProviderError>;

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), ProviderError>;

    async fn recent_commits(&self, n: u32) -> Result<Vec<Commit>, ProviderError>;

    fn clear_cache(&self);
}

#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn ask(&self, prompt: &str, context: Option<&str>) -> Result<String, ProviderError>;
}

/// Maps a non-2xx status to the error taxonomy. The body excerpt is kept
/// short so it can be surfaced verbatim in diagnostics.
pub(crate) fn map_status(status: u16, body: &str) -> ProviderError {
    match status {
        404 => ProviderError::NotFound,
        401 | 403 => ProviderError::Unauthorized,
        409 => ProviderError::Conflict,
        429 => ProviderError::RateLimited,
        _ => ProviderError::Unknown {
            status,
            body: body.chars().take(200).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert!(matches!(map_status(404, ""), ProviderError::NotFound));
        assert!(matches!(map_status(401, ""), ProviderError::Unauthorized));
        assert!(matches!(map_status(403, ""), ProviderError::Unauthorized));
        assert!(matches!(map_status(409, ""), ProviderError::Conflict));
        assert!(matches!(map_status(429, ""), ProviderError::RateLimited));
        match map_status(500, "boom") {
            ProviderError::Unknown { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_body_is_truncated() {
        let long = "x".repeat(500);
        match map_status(500, &long) {
            ProviderError::Unknown { body, .. } => assert_eq!(body.len(), 200),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
