//! Error types for the transcription and enhancement pipelines

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Error types for pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Acquisition failed for {url}: {reason}")]
    Acquisition { url: String, reason: String },

    #[error("Audio extraction produced no output for {0}")]
    Extraction(String),

    #[error("Transcription failed for chunk {chunk}: {reason}")]
    Transcription { chunk: String, reason: String },

    #[error("Correction failed for '{name}': {reason}")]
    Correction { name: String, reason: String },

    #[error("Batch character budget exceeded: {total} pending chars > {ceiling} ceiling")]
    BudgetExceeded { total: usize, ceiling: usize },

    #[error("Transcript already exists: {0}")]
    AlreadyExists(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
