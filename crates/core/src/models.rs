use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One checkbox line derived from file content. Never stored: recomputed
/// on every parse. Identity is `(source_file, raw_line)`, so mutations
/// survive the list shifting underneath them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub task: String,
    pub project: String,
    pub done: bool,
    pub source_file: String,
    /// Exact line text as stored in the file.
    pub raw_line: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoEntry {
    pub timestamp: String,
    pub text: String,
    pub raw_line: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectGroup {
    pub name: String,
    pub files: Vec<String>,
    pub total_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultStats {
    pub total: usize,
    pub projects: usize,
    pub dailies: usize,
    pub knowledge: usize,
    pub weekly: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchHitKind {
    Filename,
    Content,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub file: String,
    pub kind: SearchHitKind,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub score: u32,
    pub issues: Vec<String>,
    pub stats: HealthStats,
    /// File count per top-level folder.
    pub folders: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStats {
    pub total: usize,
    pub empty: usize,
    pub projects: usize,
}
