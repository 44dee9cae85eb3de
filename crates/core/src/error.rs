use providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error(transparent)]
    Store(#[from] ProviderError),
    /// The targeted line no longer exists in the file — distinct from a
    /// file-level `NotFound`; the caller should re-list and retry.
    #[error("task not found in {file}: {task}")]
    TaskNotFound { file: String, task: String },
    #[error("memo entry not found in {file}")]
    MemoNotFound { file: String },
    #[error("validation: {0}")]
    Validation(String),
}
