//! Read-only views composed from tree listings and bounded content
//! scans. Eventual inconsistency between the reads is accepted.

use crate::error::VaultError;
use crate::models::{
    HealthReport, HealthStats, ProjectGroup, SearchHit, SearchHitKind, VaultStats,
};
use chrono::NaiveDate;
use providers::{FileStore, RemoteFile};
use std::collections::{BTreeMap, BTreeSet};

const PROJECTS_PREFIX: &str = "Projects/";
/// Content fetches allowed per search.
const CONTENT_SCAN_BUDGET: usize = 40;
const RESULT_CAP: usize = 20;
/// Files below this size count as near-empty for the health score.
const NEAR_EMPTY_BYTES: u64 = 10;
const PRUNE_HINT_COUNT: usize = 150;

pub fn stats(files: &[RemoteFile]) -> VaultStats {
    VaultStats {
        total: files.len(),
        projects: files.iter().filter(|f| f.path.starts_with(PROJECTS_PREFIX)).count(),
        dailies: files.iter().filter(|f| f.path.starts_with("Daily/")).count(),
        knowledge: files.iter().filter(|f| f.path.starts_with("Knowledge/")).count(),
        weekly: files.iter().filter(|f| f.path.starts_with("Weekly/")).count(),
        total_size: files.iter().map(|f| f.size).sum(),
    }
}

/// Groups project files by the path segment after the prefix, busiest
/// projects first.
pub fn project_groups(files: &[RemoteFile]) -> Vec<ProjectGroup> {
    let mut groups: BTreeMap<String, ProjectGroup> = BTreeMap::new();
    for f in files.iter().filter(|f| f.path.starts_with(PROJECTS_PREFIX)) {
        let name = f.path[PROJECTS_PREFIX.len()..]
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let group = groups.entry(name.clone()).or_insert_with(|| ProjectGroup {
            name,
            files: Vec::new(),
            total_size: 0,
        });
        group.files.push(f.path.clone());
        group.total_size += f.size;
    }
    let mut out: Vec<ProjectGroup> = groups.into_values().collect();
    out.sort_by(|a, b| b.files.len().cmp(&a.files.len()));
    out
}

/// Deterministic rule-based score over a tree listing; no content
/// fetches. Deductions: today's daily note missing (10), root index
/// missing (5), one per near-empty file, three per project folder
/// without a same-named index. Clamped to [0, 100].
pub fn health_check(files: &[RemoteFile], today: NaiveDate) -> HealthReport {
    let mut issues = Vec::new();
    let mut score: i32 = 100;

    let today_path = format!("Daily/{}.md", today.format("%Y-%m-%d"));
    if !files.iter().any(|f| f.path == today_path) {
        issues.push(format!("no daily note for {}", today.format("%Y-%m-%d")));
        score -= 10;
    }
    if !files.iter().any(|f| f.path == "Home.md") {
        issues.push("Home.md is missing".to_string());
        score -= 5;
    }

    let empty = files.iter().filter(|f| f.size < NEAR_EMPTY_BYTES).count();
    if empty > 0 {
        issues.push(format!("near-empty files: {empty}"));
        score -= empty as i32;
    }

    let project_dirs: BTreeSet<&str> = files
        .iter()
        .filter_map(|f| f.path.strip_prefix(PROJECTS_PREFIX))
        .filter_map(|rest| rest.split('/').next())
        .collect();
    for p in &project_dirs {
        let index = format!("{PROJECTS_PREFIX}{p}/{p}.md");
        if !files.iter().any(|f| f.path == index) {
            issues.push(format!("Projects/{p} has no index file"));
            score -= 3;
        }
    }

    if files.len() > PRUNE_HINT_COUNT {
        issues.push(format!("note count: {} (consider pruning)", files.len()));
    }

    let mut folders: BTreeMap<String, usize> = BTreeMap::new();
    for f in files {
        let top = f.path.split('/').next().unwrap_or_default().to_string();
        *folders.entry(top).or_insert(0) += 1;
    }

    HealthReport {
        score: score.clamp(0, 100) as u32,
        issues,
        stats: HealthStats {
            total: files.len(),
            empty,
            projects: project_dirs.len(),
        },
        folders,
    }
}

/// Two-phase search: filename stems first (no content fetch), then a
/// budgeted content scan. Filename hits always precede content hits and
/// are never evicted by them.
pub async fn search(store: &dyn FileStore, keyword: &str) -> Result<Vec<SearchHit>, VaultError> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return Err(VaultError::Validation("search keyword must not be empty".into()));
    }
    let files = store.list_md_files().await?;

    let mut results: Vec<SearchHit> = Vec::new();
    for f in &files {
        let name = f.path.rsplit('/').next().unwrap_or(&f.path);
        let stem = name.strip_suffix(".md").unwrap_or(name);
        if stem.to_lowercase().contains(&keyword) {
            results.push(SearchHit {
                file: f.path.clone(),
                kind: SearchHitKind::Filename,
                preview: f.path.clone(),
            });
        }
    }

    for f in files.iter().take(CONTENT_SCAN_BUDGET) {
        if results.len() >= RESULT_CAP {
            break;
        }
        if results.iter().any(|r| r.file == f.path) {
            continue;
        }
        let content = match store.read_file(&f.path, false).await {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %f.path, error = %e, "skipping unreadable search candidate");
                continue;
            }
        };
        if content.to_lowercase().contains(&keyword) {
            let line = content
                .split('\n')
                .find(|l| l.to_lowercase().contains(&keyword))
                .unwrap_or("");
            results.push(SearchHit {
                file: f.path.clone(),
                kind: SearchHitKind::Content,
                preview: line.trim().chars().take(100).collect(),
            });
        }
    }

    results.truncate(RESULT_CAP);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(path: &str, size: u64) -> RemoteFile {
        RemoteFile {
            path: path.to_string(),
            size,
            sha: "s".to_string(),
        }
    }

    #[test]
    fn stats_count_by_prefix_and_sum_sizes() {
        let files = vec![
            remote("Projects/alpha/alpha.md", 100),
            remote("Projects/beta/beta.md", 50),
            remote("Daily/2026-08-07.md", 30),
            remote("Knowledge/rust.md", 70),
            remote("Home.md", 20),
        ];
        let s = stats(&files);
        assert_eq!(s.total, 5);
        assert_eq!(s.projects, 2);
        assert_eq!(s.dailies, 1);
        assert_eq!(s.knowledge, 1);
        assert_eq!(s.weekly, 0);
        assert_eq!(s.total_size, 270);
    }

    #[test]
    fn project_groups_sort_by_file_count() {
        let files = vec![
            remote("Projects/small/small.md", 10),
            remote("Projects/big/big.md", 10),
            remote("Projects/big/notes.md", 20),
            remote("Projects/big/ideas.md", 30),
        ];
        let groups = project_groups(&files);
        assert_eq!(groups[0].name, "big");
        assert_eq!(groups[0].files.len(), 3);
        assert_eq!(groups[0].total_size, 60);
        assert_eq!(groups[1].name, "small");
    }

    #[test]
    fn health_deducts_for_missing_daily_and_home() {
        let files = vec![remote("Knowledge/rust.md", 100)];
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let report = health_check(&files, today);
        assert_eq!(report.score, 85);
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues[0].contains("2026-08-07"));
        assert!(report.issues[1].contains("Home.md"));
    }

    #[test]
    fn health_deducts_per_empty_file_and_missing_project_index() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let files = vec![
            remote("Home.md", 100),
            remote("Daily/2026-08-07.md", 100),
            remote("Projects/alpha/notes.md", 4),
            remote("Projects/beta/beta.md", 100),
        ];
        // One near-empty file (-1), alpha lacks its index (-3).
        let report = health_check(&files, today);
        assert_eq!(report.score, 96);
        assert_eq!(report.stats.empty, 1);
        assert_eq!(report.stats.projects, 2);
        assert_eq!(report.folders["Projects"], 2);
        assert_eq!(report.folders["Home.md"], 1);
    }

    #[test]
    fn health_score_clamps_at_zero() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let files: Vec<RemoteFile> = (0..200)
            .map(|i| remote(&format!("Projects/p{i}/stub.md"), 1))
            .collect();
        let report = health_check(&files, today);
        assert_eq!(report.score, 0);
        assert!(report.issues.iter().any(|i| i.contains("consider pruning")));
    }
}
