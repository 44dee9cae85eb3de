//! Quick notes: timestamped one-liners appended to the day's daily
//! file, created with a dated header when absent.

use crate::error::VaultError;
use crate::todos::{actor_tag, truncate_chars};
use chrono::{DateTime, Local, NaiveDate};
use providers::{FileStore, ProviderError};

pub fn daily_path(date: NaiveDate) -> String {
    format!("Daily/{}.md", date.format("%Y-%m-%d"))
}

fn daily_header(date: NaiveDate) -> String {
    let d = date.format("%Y-%m-%d");
    format!("---\ndate: {d}\ntags: #type/daily\n---\n# {d}\n")
}

/// Returns the path written.
pub async fn add_quick_note(
    store: &dyn FileStore,
    text: &str,
    actor: Option<&str>,
    now: DateTime<Local>,
) -> Result<String, VaultError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VaultError::Validation("note text must not be empty".into()));
    }
    let path = daily_path(now.date_naive());
    let content = match store.read_file(&path, false).await {
        Ok(c) => c,
        Err(ProviderError::NotFound) => daily_header(now.date_naive()),
        Err(e) => return Err(e.into()),
    };
    let updated = format!("{content}\n- {} {text}", now.format("%H:%M"));
    let message = format!("{}📝 Quick note: {}", actor_tag(actor), truncate_chars(text, 30));
    store.write_file(&path, &updated, &message).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_header_carry_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(daily_path(date), "Daily/2026-08-07.md");
        let header = daily_header(date);
        assert!(header.starts_with("---\ndate: 2026-08-07\n"));
        assert!(header.ends_with("# 2026-08-07\n"));
    }
}
