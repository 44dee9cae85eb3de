//! TODO extraction and mutation: line-oriented pattern matching over
//! markdown checkboxes, no general parser. Every mutation re-reads its
//! source file with cache bypass, transforms the text, and writes the
//! whole file back; a transform that changes nothing is an error, never
//! a silent no-op write.

use crate::error::VaultError;
use crate::models::TodoItem;
use providers::{FileStore, ProviderError, RemoteFile};

pub const HOME_FILE: &str = "Home.md";
const PROJECTS_PREFIX: &str = "Projects/";
/// Project log folders (named in Japanese in the vault) hold generated
/// content and are skipped when collecting tasks.
const LOG_FOLDER_MARKER: &str = "ログ";
/// Content fetches per listing pass.
const FILE_BUDGET: usize = 20;

const OPEN_MARKER: &str = "- [ ] ";
const IN_PROGRESS_MARKER: &str = "- [/] ";
const DONE_MARKER: &str = "- [x] ";

fn parse_line(line: &str) -> Option<(bool, String)> {
    let s = line.trim();
    // An in-progress marker normalizes to open.
    if let Some(rest) = s.strip_prefix("- [ ]").or_else(|| s.strip_prefix("- [/]")) {
        return Some((false, rest.trim().to_string()));
    }
    if let Some(rest) = s.strip_prefix("- [x]") {
        return Some((true, rest.trim().to_string()));
    }
    None
}

fn project_for(path: &str) -> String {
    match path.strip_prefix(PROJECTS_PREFIX) {
        Some(rest) => rest.split('/').next().unwrap_or("Home").to_string(),
        None => "Home".to_string(),
    }
}

pub fn parse_todos(path: &str, content: &str) -> Vec<TodoItem> {
    let project = project_for(path);
    content
        .split('\n')
        .filter_map(|line| {
            parse_line(line).map(|(done, task)| TodoItem {
                task,
                project: project.clone(),
                done,
                source_file: path.to_string(),
                raw_line: line.to_string(),
            })
        })
        .collect()
}

/// Files worth scanning for tasks: everything under the projects prefix
/// (log folders excluded) plus the root index, bounded by the fetch
/// budget.
pub fn todo_targets(files: &[RemoteFile]) -> Vec<&RemoteFile> {
    files
        .iter()
        .filter(|f| {
            (f.path.starts_with(PROJECTS_PREFIX) && !f.path.contains(LOG_FOLDER_MARKER))
                || f.path == HOME_FILE
        })
        .take(FILE_BUDGET)
        .collect()
}

pub async fn collect_todos(store: &dyn FileStore) -> Result<Vec<TodoItem>, VaultError> {
    let files = store.list_md_files().await?;
    let mut todos = Vec::new();
    for f in todo_targets(&files) {
        match store.read_file(&f.path, false).await {
            Ok(content) => todos.extend(parse_todos(&f.path, &content)),
            // An unreadable candidate is skipped, not fatal.
            Err(e) => {
                tracing::debug!(path = %f.path, error = %e, "skipping unreadable todo source")
            }
        }
    }
    Ok(todos)
}

/// Flips the first exact `marker + task` occurrence. `done` is the
/// item's current state. `None` when the text no longer matches — the
/// file changed concurrently or the task was edited.
pub fn toggle_in_content(content: &str, task: &str, done: bool) -> Option<String> {
    if done {
        replace_first(
            content,
            &format!("{DONE_MARKER}{task}"),
            &format!("{OPEN_MARKER}{task}"),
        )
    } else {
        replace_first(
            content,
            &format!("{OPEN_MARKER}{task}"),
            &format!("{DONE_MARKER}{task}"),
        )
        .or_else(|| {
            replace_first(
                content,
                &format!("{IN_PROGRESS_MARKER}{task}"),
                &format!("{DONE_MARKER}{task}"),
            )
        })
    }
}

/// Drops every line whose trimmed text equals the task under its
/// current marker (or the in-progress variant). `None` when nothing
/// matched.
pub fn remove_task_lines(content: &str, task: &str, done: bool) -> Option<String> {
    let marker = if done { DONE_MARKER } else { OPEN_MARKER };
    let target = format!("{marker}{task}");
    let alt = format!("{IN_PROGRESS_MARKER}{task}");
    let lines: Vec<&str> = content.split('\n').collect();
    let kept: Vec<&str> = lines
        .iter()
        .filter(|l| {
            let t = l.trim();
            t != target && t != alt
        })
        .copied()
        .collect();
    if kept.len() == lines.len() {
        return None;
    }
    Some(kept.join("\n"))
}

fn replace_first(content: &str, from: &str, to: &str) -> Option<String> {
    content.find(from).map(|idx| {
        let mut s = String::with_capacity(content.len());
        s.push_str(&content[..idx]);
        s.push_str(to);
        s.push_str(&content[idx + from.len()..]);
        s
    })
}

pub(crate) fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

pub(crate) fn actor_tag(actor: Option<&str>) -> String {
    actor.map(|a| format!("[{a}] ")).unwrap_or_default()
}

pub async fn toggle_todo(
    store: &dyn FileStore,
    item: &TodoItem,
    actor: Option<&str>,
) -> Result<(), VaultError> {
    // Staleness here is the single highest-risk point for lost updates:
    // drop cached state, then read with full cache bypass.
    store.clear_cache();
    let content = store.read_file(&item.source_file, true).await?;
    let updated =
        toggle_in_content(&content, &item.task, item.done).ok_or_else(|| VaultError::TaskNotFound {
            file: item.source_file.clone(),
            task: item.task.clone(),
        })?;
    let message = if item.done {
        format!("{}🔄 Reopen: {}", actor_tag(actor), truncate_chars(&item.task, 30))
    } else {
        format!("{}✅ Done: {}", actor_tag(actor), truncate_chars(&item.task, 30))
    };
    store.write_file(&item.source_file, &updated, &message).await?;
    Ok(())
}

pub async fn delete_todo(
    store: &dyn FileStore,
    item: &TodoItem,
    actor: Option<&str>,
) -> Result<(), VaultError> {
    store.clear_cache();
    let content = store.read_file(&item.source_file, true).await?;
    let updated =
        remove_task_lines(&content, &item.task, item.done).ok_or_else(|| VaultError::TaskNotFound {
            file: item.source_file.clone(),
            task: item.task.clone(),
        })?;
    let message = format!(
        "{}🗑 Delete TODO: {}",
        actor_tag(actor),
        truncate_chars(&item.task, 30)
    );
    store.write_file(&item.source_file, &updated, &message).await?;
    Ok(())
}

/// Appends a new open task, creating the target file with a minimal
/// header when it does not exist yet. Returns the path written.
pub async fn add_todo(
    store: &dyn FileStore,
    project: &str,
    task: &str,
    actor: Option<&str>,
) -> Result<String, VaultError> {
    let task = task.trim();
    if task.is_empty() {
        return Err(VaultError::Validation("task text must not be empty".into()));
    }
    let project = project.trim();
    let project = if project.is_empty() { "Home" } else { project };
    let path = if project == "Home" {
        HOME_FILE.to_string()
    } else {
        format!("{PROJECTS_PREFIX}{project}/{project}.md")
    };
    let content = match store.read_file(&path, false).await {
        Ok(c) => c,
        Err(ProviderError::NotFound) => format!("# {project}\n\n## TODO\n"),
        Err(e) => return Err(e.into()),
    };
    let updated = format!("{content}\n{OPEN_MARKER}{task}");
    let message = format!(
        "{}📋 Add TODO: {}",
        actor_tag(actor),
        truncate_chars(task, 30)
    );
    store.write_file(&path, &updated, &message).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "# alpha\n\n## TODO\n- [ ] ship the release\n- [/] draft docs\n- [x] set up CI\nplain text line\n- not a checkbox\n";

    #[test]
    fn parse_recognizes_markers_and_normalizes_in_progress() {
        let todos = parse_todos("Projects/alpha/alpha.md", FIXTURE);
        assert_eq!(todos.len(), 3);
        assert_eq!(todos[0].task, "ship the release");
        assert!(!todos[0].done);
        assert_eq!(todos[1].task, "draft docs");
        assert!(!todos[1].done, "in-progress marker reads as open");
        assert!(todos[2].done);
        assert!(todos.iter().all(|t| t.project == "alpha"));
    }

    #[test]
    fn parse_derives_project_from_path() {
        assert_eq!(parse_todos("Home.md", "- [ ] x")[0].project, "Home");
        assert_eq!(
            parse_todos("Projects/beta/notes.md", "- [ ] x")[0].project,
            "beta"
        );
    }

    #[test]
    fn toggle_and_back_restores_content_exactly() {
        let done = toggle_in_content(FIXTURE, "ship the release", false).unwrap();
        assert!(done.contains("- [x] ship the release"));
        let restored = toggle_in_content(&done, "ship the release", true).unwrap();
        assert_eq!(restored, FIXTURE);
    }

    #[test]
    fn toggle_leaves_untargeted_lines_untouched() {
        let done = toggle_in_content(FIXTURE, "ship the release", false).unwrap();
        let before: Vec<&str> = FIXTURE.split('\n').collect();
        let after: Vec<&str> = done.split('\n').collect();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            if !b.contains("ship the release") {
                assert_eq!(b, a);
            }
        }
    }

    #[test]
    fn toggle_works_on_multibyte_tasks() {
        let content = "- [ ] 日本語のタスクを書く\n";
        let done = toggle_in_content(content, "日本語のタスクを書く", false).unwrap();
        assert_eq!(done, "- [x] 日本語のタスクを書く\n");
        let back = toggle_in_content(&done, "日本語のタスクを書く", true).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn toggle_of_missing_task_returns_none() {
        assert!(toggle_in_content(FIXTURE, "no such task", false).is_none());
        // A task whose text was edited concurrently no longer matches.
        assert!(toggle_in_content(FIXTURE, "ship the releas", true).is_none());
    }

    #[test]
    fn toggle_promotes_in_progress_to_done() {
        let done = toggle_in_content(FIXTURE, "draft docs", false).unwrap();
        assert!(done.contains("- [x] draft docs"));
        assert!(!done.contains("- [/] draft docs"));
    }

    #[test]
    fn remove_drops_only_matching_lines_and_keeps_trailing_newline() {
        let removed = remove_task_lines(FIXTURE, "set up CI", true).unwrap();
        assert!(!removed.contains("set up CI"));
        assert!(removed.contains("- [ ] ship the release"));
        assert!(removed.ends_with('\n'), "trailing newline survives");
    }

    #[test]
    fn remove_of_missing_task_returns_none() {
        assert!(remove_task_lines(FIXTURE, "set up CI", false).is_none());
        assert!(remove_task_lines(FIXTURE, "gone entirely", true).is_none());
    }

    #[test]
    fn targets_include_projects_and_home_but_not_logs() {
        let files = vec![
            remote("Projects/alpha/alpha.md"),
            remote("Projects/alpha/ログ/2026-08-01.md"),
            remote("Home.md"),
            remote("Knowledge/rust.md"),
        ];
        let targets: Vec<&str> = todo_targets(&files).iter().map(|f| f.path.as_str()).collect();
        assert_eq!(targets, vec!["Projects/alpha/alpha.md", "Home.md"]);
    }

    #[test]
    fn targets_respect_the_fetch_budget() {
        let files: Vec<RemoteFile> = (0..30)
            .map(|i| remote(&format!("Projects/p{i}/p{i}.md")))
            .collect();
        assert_eq!(todo_targets(&files).len(), FILE_BUDGET);
    }

    fn remote(path: &str) -> RemoteFile {
        RemoteFile {
            path: path.to_string(),
            size: 100,
            sha: "s".to_string(),
        }
    }
}
