use anyhow::Result as AnyResult;
use async_trait::async_trait;
use lecture_scribe::{
    canonicalize, plan_chunks, ChatMessage, ConfigBuilder, ContextEnhancer, Llm, LlmProvider,
    LlmResponse, ScribeError, SpeechRecognizer, Transcriber, TranscriptKind, TranscriptStore,
    CHUNK_MARKER,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Correction model stub that echoes the raw transcript section of each
/// prompt back uppercased, recording every prompt it receives.
struct RecordingLlm {
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingLlm {
    fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                prompts: Arc::clone(&prompts),
            },
            prompts,
        )
    }
}

#[async_trait]
impl Llm for RecordingLlm {
    async fn chat(&self, messages: Vec<ChatMessage>) -> AnyResult<LlmResponse> {
        let prompt = messages.last().unwrap().content.clone();
        let raw = prompt
            .rsplit("transcript to enhance:\n")
            .next()
            .unwrap()
            .rsplit_once("\n\nReturn ONLY")
            .unwrap()
            .0
            .to_string();
        self.prompts.lock().unwrap().push(prompt);
        Ok(LlmResponse {
            content: raw.to_uppercase(),
            tokens_used: None,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_type(&self) -> LlmProvider {
        LlmProvider::LmStudio
    }
}

struct WordRecognizer;

#[async_trait]
impl SpeechRecognizer for WordRecognizer {
    async fn recognize(&self, chunk_path: &Path, language: Option<&str>) -> AnyResult<String> {
        assert_eq!(language, Some("ru"));
        Ok(format!(
            "speech from {}",
            chunk_path.file_stem().unwrap().to_string_lossy()
        ))
    }
}

async fn store_in(temp: &TempDir) -> TranscriptStore {
    let store = TranscriptStore::new(temp.path().join("raw"), temp.path().join("enhanced"));
    store.ensure_dirs().await.unwrap();
    store
}

fn enhancer_over(store: &TranscriptStore, llm: RecordingLlm, k: usize) -> ContextEnhancer {
    let config = ConfigBuilder::new().with_context_window(k).build().enhancement;
    ContextEnhancer::new(Box::new(llm), store.clone(), &config, 5.0)
}

#[test]
fn test_canonical_names_are_stable_storage_keys() {
    let title = "Видео 1.1. Предмет философии науки?";
    let first = canonicalize(title);
    let second = canonicalize(title);
    assert_eq!(first, second);
    assert_eq!(first, "Видео 1.1. Предмет философии науки");
    // Already-canonical names pass through unchanged
    assert_eq!(canonicalize(&first), first);
}

#[test]
fn test_chunk_plan_grid() {
    for &duration in &[0.5, 10.0, 49.9, 50.0, 50.1, 120.0, 3600.0] {
        let spans = plan_chunks(duration, 50.0, 5.0).unwrap();

        let stride = 45.0;
        for (i, span) in spans.iter().enumerate() {
            assert_eq!(span.index, i);
            assert_eq!(span.start, i as f64 * stride);
            assert!(span.start < duration);
            assert!(span.length > 0.0);
            assert!((span.start + span.length - duration).abs() < 1e-9 || span.length == 50.0);
        }

        // Chunks jointly cover [0, duration)
        let last = spans.last().unwrap();
        assert!(last.start + last.length >= duration);
    }
}

#[tokio::test]
async fn test_transcription_feeds_enhancement() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp).await;

    // Pipeline A: recognize two chunk files into a marked raw transcript
    let chunk_dir = temp.path().join("chunks");
    tokio::fs::create_dir_all(&chunk_dir).await.unwrap();
    let mut chunks = Vec::new();
    for i in 0..2 {
        let path = chunk_dir.join(format!("chunk_{:03}.wav", i));
        tokio::fs::write(&path, b"pcm").await.unwrap();
        chunks.push(path);
    }

    let recognizer = WordRecognizer;
    let transcriber = Transcriber::new(&recognizer, Some("ru".to_string()));
    let raw = transcriber.transcribe(&chunks).await.unwrap();
    assert_eq!(raw.matches(CHUNK_MARKER).count(), 2);
    store.write("1.1", TranscriptKind::Raw, &raw).await.unwrap();

    // Pipeline B: the enhancement prompt carries the raw markers and the
    // instruction to strip them
    let (llm, prompts) = RecordingLlm::new();
    let enhancer = enhancer_over(&store, llm, 1);
    let batch = store.list_raw().await.unwrap();
    let outputs = enhancer.enhance_batch(&batch).await.unwrap();

    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].contains("SPEECH FROM CHUNK_000"));
    assert!(store.exists("1.1", TranscriptKind::Enhanced));

    let prompts = prompts.lock().unwrap();
    assert!(prompts[0].contains("remove all 'New chunk:' delimiters"));
    assert_eq!(prompts[0].matches(CHUNK_MARKER).count(), 2);
}

#[tokio::test]
async fn test_enhancement_resumes_after_restart() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp).await;

    for (name, text) in [("1.1", "first raw"), ("1.2", "second raw"), ("2.1", "third raw")] {
        store.write(name, TranscriptKind::Raw, text).await.unwrap();
    }
    let batch = store.list_raw().await.unwrap();

    // First run: interrupted after two items (simulated by a short batch)
    let (llm, prompts) = RecordingLlm::new();
    let enhancer = enhancer_over(&store, llm, 1);
    enhancer.enhance_batch(&batch[..2]).await.unwrap();
    assert_eq!(prompts.lock().unwrap().len(), 2);

    // Second run over the full batch, fresh enhancer: only the third item
    // triggers a call, and its context is the on-disk second item
    let (llm, prompts) = RecordingLlm::new();
    let enhancer = enhancer_over(&store, llm, 1);
    let outputs = enhancer.enhance_batch(&batch).await.unwrap();

    assert_eq!(
        outputs,
        vec![
            "FIRST RAW".to_string(),
            "SECOND RAW".to_string(),
            "THIRD RAW".to_string()
        ]
    );

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("SECOND RAW"));
    assert!(!prompts[0].contains("FIRST RAW"));
}

#[tokio::test]
async fn test_enhancement_order_is_strict() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp).await;

    let batch: Vec<(String, String)> = (0..5)
        .map(|i| (format!("{}.1", i), format!("lecture {}", i)))
        .collect();

    let (llm, prompts) = RecordingLlm::new();
    let enhancer = enhancer_over(&store, llm, 1);
    enhancer.enhance_batch(&batch).await.unwrap();

    // Each call's context window is the immediately preceding item's output,
    // which can only hold if item i completed before item i+1 started
    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 5);
    for i in 1..5 {
        assert!(prompts[i].contains(&format!("LECTURE {}", i - 1)));
    }
}

#[tokio::test]
async fn test_enhanced_transcripts_survive_later_failures() {
    struct FailSecondLlm {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Llm for FailSecondLlm {
        async fn chat(&self, _messages: Vec<ChatMessage>) -> AnyResult<LlmResponse> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls > 1 {
                return Err(anyhow::anyhow!("network failure"));
            }
            Ok(LlmResponse {
                content: "ENHANCED ONE".to_string(),
                tokens_used: None,
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn provider_type(&self) -> LlmProvider {
            LlmProvider::LmStudio
        }
    }

    let temp = TempDir::new().unwrap();
    let store = store_in(&temp).await;

    let config = ConfigBuilder::new().build().enhancement;
    let enhancer = ContextEnhancer::new(
        Box::new(FailSecondLlm {
            calls: Mutex::new(0),
        }),
        store.clone(),
        &config,
        5.0,
    );

    let batch = vec![
        ("1.1".to_string(), "one".to_string()),
        ("1.2".to_string(), "two".to_string()),
    ];
    let err = enhancer.enhance_batch(&batch).await.unwrap_err();
    assert!(matches!(err, ScribeError::Correction { .. }));

    // The first item's durable artifact is intact, the failed one absent,
    // so the next run skips item one and retries item two
    assert_eq!(
        store.read("1.1", TranscriptKind::Enhanced).await.unwrap(),
        "ENHANCED ONE"
    );
    assert!(!store.exists("1.2", TranscriptKind::Enhanced));
}
