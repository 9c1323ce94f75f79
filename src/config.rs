use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::LlmProvider;

/// Configuration for the lecture transcription pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Media acquisition settings
    pub acquisition: AcquisitionConfig,

    /// Audio chunking settings
    pub chunking: ChunkingConfig,

    /// Speech recognition settings
    pub transcription: TranscriptionConfig,

    /// LLM enhancement settings
    pub enhancement: EnhancementConfig,

    /// Transcript storage settings
    pub storage: StorageConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Working root for per-source directories (audio and intermediates)
    pub work_dir: PathBuf,

    /// Retries when deleting an intermediate media file that is still locked
    pub delete_retries: u32,

    /// Backoff between deletion retries, in milliseconds
    pub delete_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunk window length in seconds
    pub window_seconds: f64,

    /// Overlap between consecutive chunks in seconds (must be < window)
    pub overlap_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper model to use
    pub model: String,

    /// Language hint for recognition (None = auto-detect)
    pub language: Option<String>,

    /// Number of threads for the whisper backend
    pub threads: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// API endpoint (for LMStudio and custom providers)
    pub endpoint: Option<String>,

    /// API key (for cloud providers)
    pub api_key: Option<String>,

    /// Model to use
    pub model: String,

    /// Maximum tokens to generate per correction call
    pub max_tokens: u32,

    /// Temperature for generation (low = consistent corrections)
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Number of previous enhanced transcripts fed as context (K)
    pub context_window: usize,

    /// Ceiling on total pending raw characters before the batch is refused
    pub char_budget: usize,

    /// Domain hint injected into the correction prompt for proper nouns
    pub domain_hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding raw transcripts, one `<name>.txt` per source
    pub raw_dir: PathBuf,

    /// Directory holding enhanced transcripts, same naming scheme
    pub enhanced_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of concurrent pipeline-A workers
    pub max_workers: usize,
}

impl Config {
    /// Load configuration from file, falling back to environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "lecture-scribe.toml",
            "config/lecture-scribe.toml",
            "~/.config/lecture-scribe/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(workers) = std::env::var("LECTURE_SCRIBE_WORKERS") {
            config.performance.max_workers = workers.parse().unwrap_or(4);
        }

        if let Ok(api_key) = std::env::var("LECTURE_SCRIBE_API_KEY") {
            config.enhancement.api_key = Some(api_key);
        }

        if let Ok(work_dir) = std::env::var("LECTURE_SCRIBE_WORK_DIR") {
            config.acquisition.work_dir = PathBuf::from(work_dir);
        }

        if let Ok(language) = std::env::var("LECTURE_SCRIBE_LANGUAGE") {
            config.transcription.language = Some(language);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.performance.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if self.chunking.window_seconds <= 0.0 {
            return Err(anyhow!("window_seconds must be greater than 0"));
        }

        if self.chunking.overlap_seconds < 0.0
            || self.chunking.overlap_seconds >= self.chunking.window_seconds
        {
            return Err(anyhow!("overlap_seconds must satisfy 0 <= overlap < window"));
        }

        if self.enhancement.char_budget == 0 {
            return Err(anyhow!("char_budget must be greater than 0"));
        }

        match self.enhancement.provider {
            LlmProvider::OpenAi => {
                if self.enhancement.api_key.is_none() {
                    return Err(anyhow!("API key required for the OpenAI provider"));
                }
            }
            LlmProvider::LmStudio => {
                if self.enhancement.endpoint.is_none() {
                    return Err(anyhow!("Endpoint required for the LMStudio provider"));
                }
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acquisition: AcquisitionConfig {
                work_dir: PathBuf::from("./work"),
                delete_retries: 5,
                delete_backoff_ms: 200,
            },
            chunking: ChunkingConfig {
                window_seconds: 50.0,
                overlap_seconds: 5.0,
            },
            transcription: TranscriptionConfig {
                model: "base".to_string(),
                language: Some("ru".to_string()),
                threads: 4,
            },
            enhancement: EnhancementConfig {
                provider: LlmProvider::LmStudio,
                endpoint: Some("http://localhost:1234/v1/chat/completions".to_string()),
                api_key: None,
                model: "local-model".to_string(),
                max_tokens: 10000,
                temperature: 0.1,
                timeout_seconds: 120,
                context_window: 1,
                char_budget: 1_000_000,
                domain_hint: "use your knowledge in philosophy and history".to_string(),
            },
            storage: StorageConfig {
                raw_dir: PathBuf::from("transcripts"),
                enhanced_dir: PathBuf::from("enhanced_transcripts"),
            },
            performance: PerformanceConfig {
                max_workers: num_cpus::get().min(4),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_workers = workers;
        self
    }

    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.config.acquisition.work_dir = dir;
        self
    }

    pub fn with_chunking(mut self, window_seconds: f64, overlap_seconds: f64) -> Self {
        self.config.chunking.window_seconds = window_seconds;
        self.config.chunking.overlap_seconds = overlap_seconds;
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.config.transcription.language = language;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.enhancement.api_key = Some(api_key);
        self
    }

    pub fn with_context_window(mut self, k: usize) -> Self {
        self.config.enhancement.context_window = k;
        self
    }

    pub fn with_char_budget(mut self, budget: usize) -> Self {
        self.config.enhancement.char_budget = budget;
        self
    }

    pub fn with_storage(mut self, raw_dir: PathBuf, enhanced_dir: PathBuf) -> Self {
        self.config.storage.raw_dir = raw_dir;
        self.config.storage.enhanced_dir = enhanced_dir;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunking.window_seconds, 50.0);
        assert_eq!(config.chunking.overlap_seconds, 5.0);
        assert_eq!(config.enhancement.context_window, 1);
        assert_eq!(config.enhancement.char_budget, 1_000_000);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_workers(8)
            .with_chunking(60.0, 10.0)
            .with_context_window(3)
            .build();

        assert_eq!(config.performance.max_workers, 8);
        assert_eq!(config.chunking.window_seconds, 60.0);
        assert_eq!(config.enhancement.context_window, 3);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_overlap_not_less_than_window() {
        let config = ConfigBuilder::new().with_chunking(50.0, 50.0).build();
        assert!(config.validate().is_err());
    }
}
