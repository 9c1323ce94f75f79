use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AcquisitionConfig;
use crate::error::{Result, ScribeError};
use crate::sources::canonicalize;

/// Local audio obtained for one source, normalized for recognition
#[derive(Debug, Clone)]
pub struct AcquiredAudio {
    pub audio_path: PathBuf,
    pub canonical_name: String,
}

/// Downloads remote media and normalizes it to mono 16 kHz PCM audio.
///
/// Prefers an audio-only download; falls back to downloading the full media
/// and extracting the audio track with ffmpeg.
#[derive(Clone)]
pub struct MediaAcquirer {
    config: AcquisitionConfig,
}

impl MediaAcquirer {
    pub fn new(config: AcquisitionConfig) -> Self {
        Self { config }
    }

    /// Resolve the canonical name for a source URL from its display title
    pub async fn resolve_name(&self, url: &str) -> String {
        canonicalize(&self.probe_title(url).await)
    }

    /// Acquire audio for one source URL.
    pub async fn acquire(&self, url: &str) -> Result<AcquiredAudio> {
        let canonical_name = self.resolve_name(url).await;
        self.acquire_named(url, &canonical_name).await
    }

    /// Acquire audio for a source whose canonical name is already known.
    ///
    /// Creates `<work_dir>/<canonical_name>/` and leaves `audio.wav` inside
    /// it. Any intermediate media file is deleted before returning.
    pub async fn acquire_named(&self, url: &str, canonical_name: &str) -> Result<AcquiredAudio> {
        let canonical_name = canonical_name.to_string();
        let source_dir = self.config.work_dir.join(&canonical_name);
        tokio::fs::create_dir_all(&source_dir).await?;

        let audio_path = source_dir.join("audio.wav");

        info!("⬇️  Acquiring audio for '{}' from {}", canonical_name, url);

        // Best case: the site serves an audio-only stream
        self.download_audio_only(url, &audio_path).await;
        if audio_path.exists() {
            info!("✅ Audio-only download succeeded: {}", audio_path.display());
            return Ok(AcquiredAudio {
                audio_path,
                canonical_name,
            });
        }

        // Fallback: full media download, then extract the audio track
        info!("📼 Audio-only download failed, falling back to full media");
        self.download_full_media(url, &source_dir).await?;

        let media_path = self.locate_media_file(&source_dir).await?.ok_or_else(|| {
            ScribeError::Acquisition {
                url: url.to_string(),
                reason: "neither audio-only nor full media download produced a file".to_string(),
            }
        })?;

        self.extract_audio(&media_path, &audio_path).await?;

        if !audio_path.exists() {
            return Err(ScribeError::Extraction(canonical_name));
        }

        self.delete_with_retries(&media_path).await;

        Ok(AcquiredAudio {
            audio_path,
            canonical_name,
        })
    }

    /// Resolve the display title of the source. Probe failure is non-fatal
    /// and falls back to the literal "video".
    async fn probe_title(&self, url: &str) -> String {
        let output = tokio::process::Command::new("yt-dlp")
            .args(["--print", "%(title)s", url])
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let title = stdout.lines().next().unwrap_or("").trim().to_string();
                if title.is_empty() {
                    "video".to_string()
                } else {
                    title
                }
            }
            Ok(output) => {
                warn!(
                    "yt-dlp failed to resolve title: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                "video".to_string()
            }
            Err(e) => {
                warn!("yt-dlp title probe failed: {}", e);
                "video".to_string()
            }
        }
    }

    async fn download_audio_only(&self, url: &str, audio_path: &Path) {
        let output = tokio::process::Command::new("yt-dlp")
            .args(["-f", "bestaudio", "-o"])
            .arg(audio_path)
            .arg(url)
            .output()
            .await;

        if let Ok(output) = output {
            if !output.status.success() {
                warn!(
                    "Audio-only download errors: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
        }
    }

    async fn download_full_media(&self, url: &str, source_dir: &Path) -> Result<()> {
        // Container format is up to the site, so the output template keeps
        // the original extension and the file is located afterwards by glob
        let template = source_dir.join("media.%(ext)s");

        let output = tokio::process::Command::new("yt-dlp")
            .args(["-f", "bestvideo+bestaudio/best", "-c", "-o"])
            .arg(&template)
            .arg(url)
            .output()
            .await?;

        if !output.status.success() {
            warn!(
                "Full media download errors: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }

    /// Find the downloaded media file regardless of its container extension
    async fn locate_media_file(&self, source_dir: &Path) -> Result<Option<PathBuf>> {
        let mut entries = tokio::fs::read_dir(source_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_media = path
                .file_stem()
                .map_or(false, |stem| stem.to_string_lossy() == "media");
            if is_media && path.extension().map_or(false, |ext| ext != "wav") {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    /// Normalize the media's audio track to mono 16 kHz signed 16-bit PCM
    async fn extract_audio(&self, media_path: &Path, audio_path: &Path) -> Result<()> {
        info!("🎵 Extracting audio from {}", media_path.display());

        let output = tokio::process::Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(media_path)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
            .arg(audio_path)
            .output()
            .await?;

        if !output.status.success() {
            warn!(
                "ffmpeg extraction errors: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }

    /// Delete the intermediate media file, retrying with backoff in case the
    /// file is transiently locked. Ultimate failure is logged, not escalated.
    async fn delete_with_retries(&self, path: &Path) {
        for attempt in 0..=self.config.delete_retries {
            match tokio::fs::remove_file(path).await {
                Ok(()) => return,
                Err(e) => {
                    if attempt == self.config.delete_retries {
                        warn!(
                            "Could not delete intermediate media {} after {} attempts: {}",
                            path.display(),
                            attempt + 1,
                            e
                        );
                    } else {
                        tokio::time::sleep(Duration::from_millis(self.config.delete_backoff_ms))
                            .await;
                    }
                }
            }
        }
    }
}
