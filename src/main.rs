use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use lecture_scribe::{assemble_markdown, load_source_list, Config, PipelineRunner, WhisperCli};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("lecture_scribe=info,warn")
        .init();

    let matches = Command::new("Lecture Scribe")
        .version("0.1.0")
        .about("Batch lecture video transcription with LLM-enhanced transcripts")
        .subcommand_required(true)
        .subcommand(
            Command::new("transcribe")
                .about("Download and transcribe a single video URL")
                .arg(
                    Arg::new("url")
                        .value_name("URL")
                        .help("Video URL to transcribe")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("batch")
                .about("Transcribe every URL in a list file (one URL per line)")
                .arg(
                    Arg::new("list")
                        .value_name("FILE")
                        .help("Path to the source list file")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("enhance")
                .about("Run the LLM correction pass over stored raw transcripts"),
        )
        .subcommand(
            Command::new("assemble")
                .about("Assemble enhanced transcripts into one markdown document")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .default_value("transcripts.md"),
                ),
        )
        .get_matches();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    config.validate()?;

    let runner = PipelineRunner::new(config.clone());

    match matches.subcommand() {
        Some(("transcribe", sub)) => {
            let url = sub.get_one::<String>("url").unwrap();

            runner.store().ensure_dirs().await?;
            let recognizer = WhisperCli::load(&config.transcription).await?;
            let outcome = runner.transcribe_source(url, &recognizer).await?;

            info!(
                "🎉 Done: {} ({:?})",
                outcome.canonical_name.as_deref().unwrap_or("unknown"),
                outcome.status
            );
        }
        Some(("batch", sub)) => {
            let list = PathBuf::from(sub.get_one::<String>("list").unwrap());
            let sources = load_source_list(&list).await?;

            let recognizer = Arc::new(WhisperCli::load(&config.transcription).await?);
            let summary = runner.transcribe_batch(sources, recognizer).await?;

            info!(
                "🎉 Transcription batch finished in {:.2}s",
                summary.elapsed.as_secs_f64()
            );
            info!("✅ Successful: {}", summary.successful);
            info!("⏭️  Skipped: {}", summary.skipped);
            info!("❌ Failed: {}", summary.failed);
        }
        Some(("enhance", _)) => {
            let outputs = runner.enhance_all().await?;
            info!("🎉 Enhancement complete: {} transcripts", outputs.len());
        }
        Some(("assemble", sub)) => {
            let output = PathBuf::from(sub.get_one::<String>("output").unwrap());
            assemble_markdown(runner.store(), &output).await?;
        }
        _ => unreachable!("subcommand required"),
    }

    Ok(())
}
