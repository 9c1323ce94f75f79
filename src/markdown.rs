use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::store::TranscriptStore;

/// Assemble all enhanced transcripts into a single markdown document,
/// sorted by canonical name, one `##` section per lecture.
pub async fn assemble_markdown(store: &TranscriptStore, output_path: &Path) -> Result<()> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(store.enhanced_dir()).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "txt") {
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().to_string());
            }
        }
    }
    names.sort();

    let mut document = String::new();
    for name in &names {
        let text = store
            .read(name, crate::store::TranscriptKind::Enhanced)
            .await?;
        document.push_str(&format!("## {}\n\n{}\n\n", name, text.trim()));
    }

    tokio::fs::write(output_path, &document).await?;
    info!(
        "📄 Assembled {} transcripts into {}",
        names.len(),
        output_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TranscriptKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_assemble_sorted_sections() {
        let temp = TempDir::new().unwrap();
        let store = TranscriptStore::new(temp.path().join("raw"), temp.path().join("enhanced"));
        store.ensure_dirs().await.unwrap();

        store
            .write("2.1", TranscriptKind::Enhanced, "second lecture\n")
            .await
            .unwrap();
        store
            .write("1.1", TranscriptKind::Enhanced, "first lecture")
            .await
            .unwrap();

        let output = temp.path().join("course.md");
        assemble_markdown(&store, &output).await.unwrap();

        let document = tokio::fs::read_to_string(&output).await.unwrap();
        assert_eq!(
            document,
            "## 1.1\n\nfirst lecture\n\n## 2.1\n\nsecond lecture\n\n"
        );
    }

    #[tokio::test]
    async fn test_assemble_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = TranscriptStore::new(temp.path().join("raw"), temp.path().join("enhanced"));
        store.ensure_dirs().await.unwrap();

        let output = temp.path().join("course.md");
        assemble_markdown(&store, &output).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&output).await.unwrap(), "");
    }
}
