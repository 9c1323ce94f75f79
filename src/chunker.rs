use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ChunkingConfig;
use crate::error::{Result, ScribeError};

/// Planned position of one chunk within the audio stream
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpan {
    /// 0-based chunk index
    pub index: usize,
    /// Start offset in seconds
    pub start: f64,
    /// Length in seconds (the final chunk may be shorter than the window)
    pub length: f64,
}

/// Compute overlapping chunk boundaries for a stream of the given duration.
///
/// Chunk `i` starts at `i * (window - overlap)` and runs for
/// `min(window, duration - start)` seconds; the sequence ends once a start
/// offset reaches the total duration. Requires `0 <= overlap < window`.
pub fn plan_chunks(duration: f64, window: f64, overlap: f64) -> Result<Vec<ChunkSpan>> {
    if window <= 0.0 || overlap < 0.0 || overlap >= window {
        return Err(ScribeError::Configuration(format!(
            "invalid chunk plan: window={}, overlap={}",
            window, overlap
        )));
    }

    let stride = window - overlap;
    let mut spans = Vec::new();
    let mut index = 0usize;

    loop {
        let start = index as f64 * stride;
        if start >= duration {
            break;
        }
        spans.push(ChunkSpan {
            index,
            start,
            length: window.min(duration - start),
        });
        index += 1;
    }

    Ok(spans)
}

/// Splits one audio file into overlapping chunk files via ffmpeg
#[derive(Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Probe total audio duration in seconds via ffprobe
    pub async fn probe_duration(&self, audio_path: &Path) -> Result<f64> {
        let output = tokio::process::Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(audio_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ScribeError::Extraction(format!(
                "ffprobe failed for {}",
                audio_path.display()
            )));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Self::parse_duration(&ffprobe_data, audio_path)
    }

    /// Pull `format.duration` out of the ffprobe JSON. A missing, unparsable
    /// or zero duration is an error: planning chunks over it would quietly
    /// produce an empty transcript that the skip logic then makes permanent.
    fn parse_duration(probe: &serde_json::Value, audio_path: &Path) -> Result<f64> {
        let duration = probe["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        if duration <= 0.0 {
            return Err(ScribeError::Extraction(format!(
                "ffprobe reported no usable duration for {}",
                audio_path.display()
            )));
        }

        Ok(duration)
    }

    /// Split the audio into overlapping chunk files, returned in index order.
    ///
    /// Each chunk is extracted without re-encoding. A chunk whose output file
    /// fails to materialize (missing or zero-byte, a known trailing-edge
    /// quirk) is dropped from the sequence rather than treated as an error.
    pub async fn split(&self, audio_path: &Path) -> Result<Vec<PathBuf>> {
        let duration = self.probe_duration(audio_path).await?;
        let spans = plan_chunks(
            duration,
            self.config.window_seconds,
            self.config.overlap_seconds,
        )?;

        let chunk_dir = self.chunk_dir(audio_path);
        tokio::fs::create_dir_all(&chunk_dir).await?;

        info!(
            "✂️  Splitting {:.1}s of audio into {} chunks ({}s window, {}s overlap)",
            duration,
            spans.len(),
            self.config.window_seconds,
            self.config.overlap_seconds
        );

        let mut chunks = Vec::new();
        for span in &spans {
            let chunk_path = chunk_dir.join(format!("chunk_{:03}.wav", span.index));

            let status = tokio::process::Command::new("ffmpeg")
                .arg("-y")
                .arg("-i")
                .arg(audio_path)
                .args([
                    "-ss",
                    &span.start.to_string(),
                    "-t",
                    &span.length.to_string(),
                    "-c",
                    "copy",
                ])
                .arg(&chunk_path)
                .status()
                .await?;

            let materialized = status.success()
                && tokio::fs::metadata(&chunk_path)
                    .await
                    .map_or(false, |m| m.len() > 0);

            if materialized {
                debug!(
                    "Chunk {} at {:.1}s (+{:.1}s): {}",
                    span.index,
                    span.start,
                    span.length,
                    chunk_path.display()
                );
                chunks.push(chunk_path);
            } else {
                warn!("Chunk {} did not materialize, skipping", span.index);
            }
        }

        Ok(chunks)
    }

    /// Remove the chunk directory. A non-empty directory is left in place.
    pub async fn cleanup(&self, audio_path: &Path) {
        let chunk_dir = self.chunk_dir(audio_path);
        if let Err(e) = tokio::fs::remove_dir(&chunk_dir).await {
            debug!("Chunk directory not removed ({}): {}", chunk_dir.display(), e);
        }
    }

    fn chunk_dir(&self, audio_path: &Path) -> PathBuf {
        audio_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("chunks")
    }
}
