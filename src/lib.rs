//! Lecture Scribe
//!
//! Turns batches of online lecture videos into corrected text transcripts.
//! Pipeline A downloads each source, normalizes it to audio, splits it into
//! overlapping chunks and runs speech recognition over them; pipeline B runs
//! an LLM correction pass that carries a sliding window of previously
//! enhanced transcripts and resumes across process restarts.

pub mod acquire;
pub mod chunker;
pub mod config;
pub mod error;
pub mod llm;
pub mod markdown;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod transcription;

// Re-export main types for easy access
pub use crate::acquire::{AcquiredAudio, MediaAcquirer};
pub use crate::chunker::{plan_chunks, ChunkSpan, Chunker};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Result, ScribeError};
pub use crate::llm::enhance::ContextEnhancer;
pub use crate::llm::{create_llm, ChatMessage, Llm, LlmConfig, LlmProvider, LlmResponse};
pub use crate::markdown::assemble_markdown;
pub use crate::pipeline::{BatchSummary, PipelineRunner, SourceOutcome, SourceStatus};
pub use crate::sources::{canonicalize, load_source_list, SourceItem};
pub use crate::store::{TranscriptKind, TranscriptStore};
pub use crate::transcription::{SpeechRecognizer, Transcriber, WhisperCli, CHUNK_MARKER};
