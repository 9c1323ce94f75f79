use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::acquire::MediaAcquirer;
use crate::chunker::Chunker;
use crate::config::Config;
use crate::error::{Result, ScribeError};
use crate::llm::enhance::ContextEnhancer;
use crate::llm::{create_llm, LlmConfig};
use crate::sources::SourceItem;
use crate::store::{TranscriptKind, TranscriptStore};
use crate::transcription::{SpeechRecognizer, Transcriber};

/// Outcome of one source's acquisition+transcription run
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub url: String,
    pub canonical_name: Option<String>,
    pub status: SourceStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SourceStatus {
    Completed,
    Skipped,
    Failed,
}

/// Batch-level results for the transcription pipeline
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub outcomes: Vec<SourceOutcome>,
}

/// Drives both pipelines: per-source chunked transcription (parallelizable
/// across sources) and the sequential, resumable enhancement pass.
#[derive(Clone)]
pub struct PipelineRunner {
    config: Config,
    store: TranscriptStore,
}

impl PipelineRunner {
    pub fn new(config: Config) -> Self {
        let store = TranscriptStore::new(
            config.storage.raw_dir.clone(),
            config.storage.enhanced_dir.clone(),
        );
        Self { config, store }
    }

    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    /// Run acquisition, chunking and transcription for a single source.
    ///
    /// Sources whose raw transcript is already stored are skipped without
    /// downloading anything.
    pub async fn transcribe_source(
        &self,
        url: &str,
        recognizer: &dyn SpeechRecognizer,
    ) -> Result<SourceOutcome> {
        let acquirer = MediaAcquirer::new(self.config.acquisition.clone());
        let canonical_name = acquirer.resolve_name(url).await;

        if self.store.exists(&canonical_name, TranscriptKind::Raw) {
            info!("⏭️  Raw transcript for '{}' exists, skipping", canonical_name);
            return Ok(SourceOutcome {
                url: url.to_string(),
                canonical_name: Some(canonical_name),
                status: SourceStatus::Skipped,
                error_message: None,
            });
        }

        let acquired = acquirer.acquire_named(url, &canonical_name).await?;

        let chunker = Chunker::new(self.config.chunking.clone());
        let chunks = chunker.split(&acquired.audio_path).await?;

        let transcriber = Transcriber::new(recognizer, self.config.transcription.language.clone());
        let transcript = transcriber.transcribe(&chunks).await;

        // Chunk files are gone either way; drop their directory too
        chunker.cleanup(&acquired.audio_path).await;

        let transcript = transcript?;
        self.store
            .write(&canonical_name, TranscriptKind::Raw, &transcript)
            .await?;

        info!(
            "✅ Raw transcript stored for '{}' ({} chars)",
            canonical_name,
            transcript.chars().count()
        );

        Ok(SourceOutcome {
            url: url.to_string(),
            canonical_name: Some(canonical_name),
            status: SourceStatus::Completed,
            error_message: None,
        })
    }

    /// Fan the transcription pipeline out over many sources with a bounded
    /// worker pool. A failed source is reported and the batch continues.
    pub async fn transcribe_batch(
        &self,
        sources: Vec<SourceItem>,
        recognizer: Arc<dyn SpeechRecognizer>,
    ) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let total = sources.len();

        self.store.ensure_dirs().await?;

        let max_workers = self.config.performance.max_workers;
        info!("🚀 Transcribing {} sources with {} workers", total, max_workers);

        let semaphore = Arc::new(Semaphore::new(max_workers));
        let (tx, mut rx) = mpsc::channel(max_workers.max(1));

        for (index, source) in sources.into_iter().enumerate() {
            let runner = self.clone();
            let recognizer = Arc::clone(&recognizer);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();

                info!("📹 Processing source {}/{}: {}", index + 1, total, source.url);

                let outcome = match runner
                    .transcribe_source(&source.url, recognizer.as_ref())
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => SourceOutcome {
                        url: source.url.clone(),
                        canonical_name: None,
                        status: SourceStatus::Failed,
                        error_message: Some(e.to_string()),
                    },
                };

                if let Err(e) = tx.send(outcome).await {
                    error!("Failed to send outcome: {}", e);
                }
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            match outcome.status {
                SourceStatus::Failed => warn!(
                    "❌ Failed: {} - {}",
                    outcome.url,
                    outcome.error_message.as_deref().unwrap_or("unknown error")
                ),
                _ => {}
            }
            outcomes.push(outcome);
        }

        let successful = outcomes
            .iter()
            .filter(|o| o.status == SourceStatus::Completed)
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| o.status == SourceStatus::Skipped)
            .count();
        let failed = outcomes.len() - successful - skipped;

        Ok(BatchSummary {
            total,
            successful,
            skipped,
            failed,
            elapsed: start_time.elapsed(),
            outcomes,
        })
    }

    /// Run the enhancement pass over every stored raw transcript, in name
    /// order, resuming past already-enhanced items.
    pub async fn enhance_all(&self) -> Result<Vec<String>> {
        if !self.config.storage.raw_dir.exists() {
            return Err(ScribeError::Configuration(format!(
                "Raw transcripts directory '{}' does not exist",
                self.config.storage.raw_dir.display()
            )));
        }
        tokio::fs::create_dir_all(&self.config.storage.enhanced_dir).await?;

        let batch = self.store.list_raw().await?;
        info!("📚 Enhancement batch: {} raw transcripts", batch.len());

        let llm_config = LlmConfig::from(&self.config.enhancement);
        let llm =
            create_llm(&llm_config).map_err(|e| ScribeError::Configuration(e.to_string()))?;

        let enhancer = ContextEnhancer::new(
            llm,
            self.store.clone(),
            &self.config.enhancement,
            self.config.chunking.overlap_seconds,
        );

        enhancer.enhance_batch(&batch).await
    }
}
