use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::SpeechRecognizer;
use crate::config::TranscriptionConfig;

/// Whisper backend flavor detected at load time
#[derive(Debug, Clone, PartialEq)]
enum Backend {
    /// whisper.cpp via `whisper-cli` or `whisper-cpp`
    Cpp(String),
    /// Python OpenAI Whisper (fallback)
    Python,
}

/// Speech recognizer backed by a whisper command-line tool.
///
/// Backend detection and model resolution happen once in [`WhisperCli::load`];
/// `recognize` calls only spawn the already-resolved command.
pub struct WhisperCli {
    backend: Backend,
    model: String,
    model_path: Option<PathBuf>,
    threads: u32,
}

/// Minimal subset of the whisper JSON output formats
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    text: String,
}

impl WhisperCli {
    /// Detect an available whisper backend and resolve the model, once.
    pub async fn load(config: &TranscriptionConfig) -> Result<Self> {
        let backends = [
            ("whisper-cli", true),
            ("whisper-cpp", true),
            ("whisper", false),
        ];

        for (cmd_name, is_cpp) in &backends {
            if Self::check_command_available(cmd_name).await {
                info!("✅ Found {} backend, using it for recognition", cmd_name);

                let backend = if *is_cpp {
                    Backend::Cpp(cmd_name.to_string())
                } else {
                    Backend::Python
                };

                let model_path = if *is_cpp {
                    Self::resolve_model_path(&config.model)
                } else {
                    None
                };

                return Ok(Self {
                    backend,
                    model: config.model.clone(),
                    model_path,
                    threads: config.threads,
                });
            }
            debug!("{} not available", cmd_name);
        }

        Err(anyhow!(
            "No whisper backend found. Please install whisper.cpp or openai-whisper"
        ))
    }

    async fn check_command_available(cmd_name: &str) -> bool {
        Command::new(cmd_name)
            .arg("--help")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Look for a ggml model file in the usual whisper.cpp locations
    fn resolve_model_path(model: &str) -> Option<PathBuf> {
        let candidates = [
            format!("models/ggml-{}.bin", model),
            format!("/usr/local/share/whisper-cpp/ggml-{}.bin", model),
            format!("/opt/homebrew/share/whisper-cpp/ggml-{}.bin", model),
        ];

        for candidate in &candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                info!("🎯 Using whisper model: {}", path.display());
                return Some(path);
            }
        }

        warn!("No ggml model file found for '{}', relying on backend default", model);
        None
    }

    async fn recognize_cpp(
        &self,
        cmd_name: &str,
        chunk_path: &Path,
        language: Option<&str>,
    ) -> Result<String> {
        let output_base = chunk_path.with_extension("");

        let mut cmd = Command::new(cmd_name);
        cmd.arg("-f")
            .arg(chunk_path)
            .arg("-oj")
            .arg("-of")
            .arg(&output_base)
            .arg("-t")
            .arg(self.threads.to_string());

        if let Some(model_path) = &self.model_path {
            cmd.arg("-m").arg(model_path);
        }
        if let Some(language) = language {
            cmd.arg("-l").arg(language);
        }

        debug!("Executing command: {:?}", cmd);
        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(anyhow!(
                "{} failed with exit code {}: {}",
                cmd_name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let json_path = output_base.with_extension("json");
        self.read_json_text(&json_path).await
    }

    async fn recognize_python(&self, chunk_path: &Path, language: Option<&str>) -> Result<String> {
        let output_dir = chunk_path.parent().unwrap_or_else(|| Path::new("."));

        let mut cmd = Command::new("whisper");
        cmd.arg(chunk_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("json")
            .arg("--verbose")
            .arg("False")
            .arg("--fp16")
            .arg("False");

        if let Some(language) = language {
            cmd.arg("--language").arg(language);
        }

        debug!("Executing command: {:?}", cmd);
        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(anyhow!(
                "whisper failed with exit code {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let json_path = chunk_path.with_extension("json");
        self.read_json_text(&json_path).await
    }

    /// Read the JSON output file and pull the recognized text out of
    /// whichever format the backend produced. The file is removed afterwards.
    async fn read_json_text(&self, json_path: &Path) -> Result<String> {
        let json_content = tokio::fs::read_to_string(json_path)
            .await
            .map_err(|e| anyhow!("No whisper JSON output at {}: {}", json_path.display(), e))?;

        let parsed: WhisperOutput = serde_json::from_str(&json_content)?;

        let text = if !parsed.transcription.is_empty() {
            parsed
                .transcription
                .iter()
                .map(|seg| seg.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            parsed
                .text
                .ok_or_else(|| anyhow!("Whisper JSON output carried no text"))?
        };

        if let Err(e) = tokio::fs::remove_file(json_path).await {
            warn!("Failed to remove whisper output {}: {}", json_path.display(), e);
        }

        Ok(text)
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCli {
    async fn recognize(&self, chunk_path: &Path, language: Option<&str>) -> Result<String> {
        match &self.backend {
            Backend::Cpp(cmd_name) => self.recognize_cpp(cmd_name, chunk_path, language).await,
            Backend::Python => self.recognize_python(chunk_path, language).await,
        }
    }
}
