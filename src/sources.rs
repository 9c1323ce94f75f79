use std::path::Path;
use tracing::debug;
use url::Url;

use crate::error::{Result, ScribeError};

/// A single media source in the batch. The canonical name is resolved from
/// the video title at acquisition time.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceItem {
    pub url: String,
}

impl SourceItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Derive a filesystem-safe slug from a video title.
///
/// Retains only alphanumerics, spaces, dots, underscores and hyphens;
/// everything else is removed outright (never substituted). Trailing
/// whitespace is trimmed so the slug is a valid directory name. Pure and
/// deterministic: the same title always maps to the same storage slot.
pub fn canonicalize(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Load the ordered batch list from a plain text file: one URL per line,
/// blank lines and `#` comments ignored, input order preserved.
pub async fn load_source_list(path: &Path) -> Result<Vec<SourceItem>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ScribeError::Configuration(format!("Cannot read source list {}: {}", path.display(), e))
    })?;

    let mut items = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        Url::parse(line).map_err(|e| {
            ScribeError::Configuration(format!(
                "Invalid URL on line {} of {}: {}",
                line_no + 1,
                path.display(),
                e
            ))
        })?;
        items.push(SourceItem::new(line));
    }

    debug!("Loaded {} sources from {}", items.len(), path.display());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_keeps_safe_chars() {
        assert_eq!(
            canonicalize("Lecture 1.2 - Intro_to Philosophy"),
            "Lecture 1.2 - Intro_to Philosophy"
        );
    }

    #[test]
    fn test_canonicalize_removes_without_substitution() {
        assert_eq!(canonicalize("a/b\\c:d*e?f\"g<h>i|j"), "abcdefghij");
        assert_eq!(canonicalize("Кант: критика"), "Кант критика");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canonicalize("What is truth? (part 2)");
        assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn test_canonicalize_trims_trailing_whitespace() {
        assert_eq!(canonicalize("title?  "), "title");
    }

    #[tokio::test]
    async fn test_load_source_list_preserves_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let list = dir.path().join("sources.txt");
        tokio::fs::write(
            &list,
            "# lecture batch\nhttps://example.com/1.1.mp4\n\nhttps://example.com/1.2.mp4\n",
        )
        .await
        .unwrap();

        let items = load_source_list(&list).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://example.com/1.1.mp4");
        assert_eq!(items[1].url, "https://example.com/1.2.mp4");
    }

    #[tokio::test]
    async fn test_load_source_list_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let list = dir.path().join("sources.txt");
        tokio::fs::write(&list, "not a url\n").await.unwrap();

        assert!(load_source_list(&list).await.is_err());
    }
}
