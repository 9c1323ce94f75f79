pub mod whisper;

pub use whisper::WhisperCli;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, ScribeError};

/// Boundary marker prefixed to every chunk's text in a raw transcript.
/// The enhancement prompt instructs the model to remove it.
pub const CHUNK_MARKER: &str = "New chunk:\n";

/// Speech-recognition backend: one expensive load, then stateless
/// per-chunk recognition calls.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, chunk_path: &Path, language: Option<&str>) -> AnyResult<String>;
}

/// Runs a speech recognizer over an ordered chunk sequence and assembles
/// the raw transcript.
///
/// The recognizer handle is constructed once per pipeline run and passed in,
/// so the model is never re-initialized per chunk.
pub struct Transcriber<'a> {
    recognizer: &'a dyn SpeechRecognizer,
    language: Option<String>,
}

impl<'a> Transcriber<'a> {
    pub fn new(recognizer: &'a dyn SpeechRecognizer, language: Option<String>) -> Self {
        Self {
            recognizer,
            language,
        }
    }

    /// Transcribe the chunks in index order and concatenate the results,
    /// each prefixed with the boundary marker.
    ///
    /// Chunk files are deleted unconditionally afterwards, even when a
    /// recognition call failed.
    pub async fn transcribe(&self, chunks: &[PathBuf]) -> Result<String> {
        let result = self.transcribe_chunks(chunks).await;

        for chunk in chunks {
            if let Err(e) = tokio::fs::remove_file(chunk).await {
                warn!("Failed to remove chunk file {}: {}", chunk.display(), e);
            }
        }

        result
    }

    async fn transcribe_chunks(&self, chunks: &[PathBuf]) -> Result<String> {
        let mut transcript = String::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            info!(
                "🎤 Transcribing chunk {}/{}: {}",
                idx + 1,
                chunks.len(),
                chunk.display()
            );

            // A failed chunk is fatal for the whole transcript; a silently
            // missing chunk would corrupt the overlap stitching downstream
            let text = self
                .recognizer
                .recognize(chunk, self.language.as_deref())
                .await
                .map_err(|e| ScribeError::Transcription {
                    chunk: chunk.display().to_string(),
                    reason: e.to_string(),
                })?;

            transcript.push_str(CHUNK_MARKER);
            transcript.push_str(text.trim());
            transcript.push('\n');
        }

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct EchoRecognizer;

    #[async_trait]
    impl SpeechRecognizer for EchoRecognizer {
        async fn recognize(&self, chunk_path: &Path, _language: Option<&str>) -> AnyResult<String> {
            Ok(format!(
                "  text of {}  ",
                chunk_path.file_stem().unwrap().to_string_lossy()
            ))
        }
    }

    struct FailingRecognizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechRecognizer for FailingRecognizer {
        async fn recognize(&self, _chunk_path: &Path, _language: Option<&str>) -> AnyResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("model crashed"))
        }
    }

    async fn make_chunks(temp: &TempDir, count: usize) -> Vec<PathBuf> {
        let mut chunks = Vec::new();
        for i in 0..count {
            let path = temp.path().join(format!("chunk_{:03}.wav", i));
            tokio::fs::write(&path, b"pcm").await.unwrap();
            chunks.push(path);
        }
        chunks
    }

    #[tokio::test]
    async fn test_transcript_assembly_with_markers() {
        let temp = TempDir::new().unwrap();
        let chunks = make_chunks(&temp, 2).await;

        let recognizer = EchoRecognizer;
        let transcriber = Transcriber::new(&recognizer, Some("ru".to_string()));
        let transcript = transcriber.transcribe(&chunks).await.unwrap();

        assert_eq!(
            transcript,
            "New chunk:\ntext of chunk_000\nNew chunk:\ntext of chunk_001\n"
        );
    }

    #[tokio::test]
    async fn test_chunk_files_deleted_after_success() {
        let temp = TempDir::new().unwrap();
        let chunks = make_chunks(&temp, 3).await;

        let recognizer = EchoRecognizer;
        let transcriber = Transcriber::new(&recognizer, None);
        transcriber.transcribe(&chunks).await.unwrap();

        for chunk in &chunks {
            assert!(!chunk.exists());
        }
    }

    #[tokio::test]
    async fn test_failed_recognition_is_fatal_but_still_cleans_up() {
        let temp = TempDir::new().unwrap();
        let chunks = make_chunks(&temp, 2).await;

        let recognizer = FailingRecognizer {
            calls: AtomicUsize::new(0),
        };
        let transcriber = Transcriber::new(&recognizer, None);
        let err = transcriber.transcribe(&chunks).await.unwrap_err();

        assert!(matches!(err, ScribeError::Transcription { .. }));
        // Aborted on the first failure rather than producing a partial text
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
        // Cleanup still ran for every chunk file
        for chunk in &chunks {
            assert!(!chunk.exists());
        }
    }

    #[tokio::test]
    async fn test_empty_chunk_list() {
        let recognizer = EchoRecognizer;
        let transcriber = Transcriber::new(&recognizer, None);
        assert_eq!(transcriber.transcribe(&[]).await.unwrap(), "");
    }
}
