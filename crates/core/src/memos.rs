//! Memo extraction and mutation against the single append-only memo
//! file. Same discipline as the TODO extractor: fresh read, pure text
//! transform, whole-file write back.

use crate::error::VaultError;
use crate::models::MemoEntry;
use crate::todos::truncate_chars;
use chrono::{DateTime, Local};
use providers::{FileStore, ProviderError};

pub const MEMOS_FILE: &str = "Memos.md";
const MEMO_HEADER: &str = "---\ntags:\n  - type/memo\n---\n\n# Memos\n";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One entry per non-empty list line.
pub fn parse_memos(content: &str) -> Vec<MemoEntry> {
    content
        .split('\n')
        .filter(|l| l.trim().starts_with("- "))
        .map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> MemoEntry {
    let trimmed = line.trim();
    let body = trimmed.strip_prefix("- ").unwrap_or(trimmed);
    // `- **<timestamp>** — <text>`; anything else keeps the body as text.
    if let Some(rest) = body.strip_prefix("**") {
        if let Some((ts, text)) = rest.split_once("** — ") {
            if !ts.is_empty() && !text.is_empty() {
                return MemoEntry {
                    timestamp: ts.to_string(),
                    text: text.to_string(),
                    raw_line: line.to_string(),
                };
            }
        }
    }
    MemoEntry {
        timestamp: String::new(),
        text: body.to_string(),
        raw_line: line.to_string(),
    }
}

pub fn format_memo_line(timestamp: &str, text: &str) -> String {
    format!("- **{timestamp}** — {text}")
}

pub async fn add_memo(
    store: &dyn FileStore,
    text: &str,
    now: DateTime<Local>,
) -> Result<(), VaultError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VaultError::Validation("memo text must not be empty".into()));
    }
    let line = format_memo_line(&now.format(TIMESTAMP_FORMAT).to_string(), text);
    // A missing memo file is not an error: start a fresh one.
    let content = match store.read_file(MEMOS_FILE, false).await {
        Ok(c) => c,
        Err(ProviderError::NotFound) => MEMO_HEADER.to_string(),
        Err(e) => return Err(e.into()),
    };
    let updated = format!("{content}\n{line}");
    let message = format!("Bot: memo - {}", truncate_chars(text, 30));
    store.write_file(MEMOS_FILE, &updated, &message).await?;
    Ok(())
}

/// Removes the entry's exact raw line, then collapses any blank-line
/// run the removal left behind.
pub async fn delete_memo(store: &dyn FileStore, raw_line: &str) -> Result<(), VaultError> {
    store.clear_cache();
    let content = store.read_file(MEMOS_FILE, true).await?;
    if raw_line.trim().is_empty() || !content.contains(raw_line) {
        return Err(VaultError::MemoNotFound {
            file: MEMOS_FILE.to_string(),
        });
    }
    let removed = content.replacen(raw_line, "", 1);
    let updated = format!("{}\n", collapse_blank_runs(&removed).trim());
    store.write_file(MEMOS_FILE, &updated, "Bot: memo done").await?;
    Ok(())
}

fn collapse_blank_runs(s: &str) -> String {
    let mut out = s.to_string();
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "---\ntags:\n  - type/memo\n---\n\n# Memos\n\n- **2026-08-06 09:15** — call the dentist\n- **2026-08-07 18:02** — 会議メモを清書する\n- loose note without timestamp\n";

    #[test]
    fn parse_extracts_timestamped_entries() {
        let memos = parse_memos(FIXTURE);
        assert_eq!(memos.len(), 3);
        assert_eq!(memos[0].timestamp, "2026-08-06 09:15");
        assert_eq!(memos[0].text, "call the dentist");
        assert_eq!(memos[1].text, "会議メモを清書する");
    }

    #[test]
    fn parse_keeps_plain_list_lines_as_untimestamped_entries() {
        let memos = parse_memos(FIXTURE);
        assert_eq!(memos[2].timestamp, "");
        assert_eq!(memos[2].text, "loose note without timestamp");
        assert_eq!(memos[2].raw_line, "- loose note without timestamp");
    }

    #[test]
    fn formatted_lines_parse_back() {
        let line = format_memo_line("2026-08-07 10:30", "買い物リスト");
        let memos = parse_memos(&line);
        let entry = &memos[0];
        assert_eq!(entry.timestamp, "2026-08-07 10:30");
        assert_eq!(entry.text, "買い物リスト");
    }

    #[test]
    fn blank_run_collapse_is_idempotent() {
        let collapsed = collapse_blank_runs("a\n\n\n\n\nb");
        assert_eq!(collapsed, "a\n\nb");
        assert_eq!(collapse_blank_runs(&collapsed), collapsed);
    }
}
