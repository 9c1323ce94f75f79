use tracing::{debug, info};

use super::{ChatMessage, Llm};
use crate::config::EnhancementConfig;
use crate::error::{Result, ScribeError};
use crate::store::{TranscriptKind, TranscriptStore};
use crate::transcription::CHUNK_MARKER;

/// Context-carrying LLM correction pass over a batch of raw transcripts.
///
/// Items are processed strictly in input order because each correction call
/// receives the last K *enhanced* transcripts as context. Every result is
/// persisted before the next item starts, which makes the batch resumable:
/// a rerun reloads already-enhanced items into the context instead of
/// calling the model again.
pub struct ContextEnhancer {
    llm: Box<dyn Llm>,
    store: TranscriptStore,
    context_window: usize,
    char_budget: usize,
    overlap_seconds: f64,
    domain_hint: String,
}

impl ContextEnhancer {
    pub fn new(
        llm: Box<dyn Llm>,
        store: TranscriptStore,
        config: &EnhancementConfig,
        overlap_seconds: f64,
    ) -> Self {
        Self {
            llm,
            store,
            context_window: config.context_window,
            char_budget: config.char_budget,
            overlap_seconds,
            domain_hint: config.domain_hint.clone(),
        }
    }

    /// Enhance an ordered batch of `(canonical_name, raw_text)` items,
    /// returning the enhanced texts in the same order.
    pub async fn enhance_batch(&self, batch: &[(String, String)]) -> Result<Vec<String>> {
        self.check_budget(batch)?;

        let mut context: Vec<String> = Vec::new();
        let mut outputs = Vec::with_capacity(batch.len());

        for (idx, (name, raw)) in batch.iter().enumerate() {
            if self.store.exists(name, TranscriptKind::Enhanced) {
                // Already enhanced on a previous run. Reload it so the
                // context window matches what a fresh run would have built.
                let enhanced = self.store.read(name, TranscriptKind::Enhanced).await?;
                info!("⏭️  '{}' already enhanced, skipping", name);
                context.push(enhanced.clone());
                outputs.push(enhanced);
                continue;
            }

            info!("📝 Enhancing '{}' ({}/{})", name, idx + 1, batch.len());
            let prompt = self.build_prompt(&context, raw);
            let response = self
                .llm
                .chat(vec![ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                }])
                .await
                .map_err(|e| ScribeError::Correction {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;

            debug!(
                "Correction call for '{}' used {:?} tokens",
                name, response.tokens_used
            );

            let enhanced = response.content.trim().to_string();

            // Persist before touching the next item so a crash here never
            // loses earlier work
            self.store
                .write_new(name, TranscriptKind::Enhanced, &enhanced)
                .await?;

            context.push(enhanced.clone());
            outputs.push(enhanced);
        }

        Ok(outputs)
    }

    /// Refuse the whole batch up front if the pending raw transcripts exceed
    /// the character budget. Equality with the ceiling proceeds.
    fn check_budget(&self, batch: &[(String, String)]) -> Result<()> {
        let total: usize = batch
            .iter()
            .filter(|(name, _)| !self.store.exists(name, TranscriptKind::Enhanced))
            .map(|(_, raw)| raw.chars().count())
            .sum();

        if total > self.char_budget {
            return Err(ScribeError::BudgetExceeded {
                total,
                ceiling: self.char_budget,
            });
        }

        debug!(
            "Pending batch size {} chars within budget of {}",
            total, self.char_budget
        );
        Ok(())
    }

    /// Build the correction prompt: fixed instruction block, the last K
    /// enhanced transcripts oldest-first, then the raw transcript itself.
    fn build_prompt(&self, context: &[String], raw: &str) -> String {
        let start = context.len().saturating_sub(self.context_window);
        let context_text = context[start..].join("\n\n");

        format!(
            "You are an expert transcriber and editor. You receive a transcript from Whisper \
             that may contain grammar errors, misheard or misspelled words, and unnecessary \
             delimiters like '{marker}'. \
             Your job is to fix grammar and spelling, correct misheard or misspelled words, \
             remove all '{marker}' delimiters, and glue the transcript together smoothly. \
             Chunks overlap by {overlap} seconds. \
             Sometimes you need to think to understand what was meant: {hint}. \
             Rewrite as little as possible: only make necessary corrections to make the text \
             correct and consistent. \
             Here are up to {window} previous enhanced transcripts for context (if any):\n\
             {context}\n\n\
             Here is the next transcript to enhance:\n\
             {raw}\n\n\
             Return ONLY the enhanced transcript, nothing else.",
            marker = CHUNK_MARKER.trim_end(),
            overlap = self.overlap_seconds,
            hint = self.domain_hint,
            window = self.context_window,
            context = context_text,
            raw = raw,
        )
    }
}
