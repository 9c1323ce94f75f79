use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, ScribeError};

/// Which stage of the pipeline a stored transcript belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptKind {
    /// Chunked recognition output, boundary markers included
    Raw,
    /// LLM-corrected final text
    Enhanced,
}

/// Durable on-disk transcript storage.
///
/// Each kind has its own directory and each source one `<canonical>.txt`
/// slot. Slots are write-once: nothing in the pipeline ever rewrites an
/// existing transcript.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    raw_dir: PathBuf,
    enhanced_dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(raw_dir: PathBuf, enhanced_dir: PathBuf) -> Self {
        Self {
            raw_dir,
            enhanced_dir,
        }
    }

    /// Create both storage directories if missing
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.raw_dir).await?;
        tokio::fs::create_dir_all(&self.enhanced_dir).await?;
        Ok(())
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn enhanced_dir(&self) -> &Path {
        &self.enhanced_dir
    }

    fn slot(&self, canonical_name: &str, kind: TranscriptKind) -> PathBuf {
        let dir = match kind {
            TranscriptKind::Raw => &self.raw_dir,
            TranscriptKind::Enhanced => &self.enhanced_dir,
        };
        dir.join(format!("{}.txt", canonical_name))
    }

    pub fn exists(&self, canonical_name: &str, kind: TranscriptKind) -> bool {
        self.slot(canonical_name, kind).exists()
    }

    pub async fn read(&self, canonical_name: &str, kind: TranscriptKind) -> Result<String> {
        Ok(tokio::fs::read_to_string(self.slot(canonical_name, kind)).await?)
    }

    pub async fn write(
        &self,
        canonical_name: &str,
        kind: TranscriptKind,
        text: &str,
    ) -> Result<()> {
        let path = self.slot(canonical_name, kind);
        tokio::fs::write(&path, text).await?;
        debug!("Wrote {} transcript: {}", kind_label(kind), path.display());
        Ok(())
    }

    /// Exclusive-create write: fails if the slot is already occupied, so a
    /// concurrent writer cannot clobber a committed transcript.
    pub async fn write_new(
        &self,
        canonical_name: &str,
        kind: TranscriptKind,
        text: &str,
    ) -> Result<()> {
        let path = self.slot(canonical_name, kind);
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);

        match options.open(&path).await {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                file.write_all(text.as_bytes()).await?;
                file.flush().await?;
                debug!("Wrote {} transcript: {}", kind_label(kind), path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ScribeError::AlreadyExists(canonical_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List raw transcripts as `(canonical_name, text)` pairs, sorted by
    /// name. This is the fixed batch order consumed by the enhancement pass.
    pub async fn list_raw(&self) -> Result<Vec<(String, String)>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.raw_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "txt") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().to_string());
                }
            }
        }
        names.sort();

        let mut transcripts = Vec::with_capacity(names.len());
        for name in names {
            let text = self.read(&name, TranscriptKind::Raw).await?;
            transcripts.push((name, text));
        }
        Ok(transcripts)
    }
}

fn kind_label(kind: TranscriptKind) -> &'static str {
    match kind {
        TranscriptKind::Raw => "raw",
        TranscriptKind::Enhanced => "enhanced",
    }
}
