/*!
 * Tests for chunk synthesis followed by narration assembly
 */

use std::sync::Arc;

use slidecast::app_config::{EncodeConfig, SynthesisConfig, VoiceSelection};
use slidecast::errors::{PipelineError, SynthesisError};
use slidecast::language_utils::Language;
use slidecast::media::MediaOps;
use slidecast::speech::{AudioAssembler, SpeechSynthesisStage};
use slidecast::text_chunker::TextChunk;

use crate::common::{self, MockEncodeTool, MockSynthesizer};

fn fast_synthesis() -> SynthesisConfig {
    SynthesisConfig {
        max_attempts: 3,
        base_delay_ms: 0,
        max_delay_ms: 0,
        stabilization_pause_ms: 0,
        min_audio_bytes: 100,
        ..SynthesisConfig::default()
    }
}

fn chunk(ordinal: usize, text: &str, language: Language) -> TextChunk {
    TextChunk { ordinal, text: text.to_string(), language }
}

fn media(encoder: Arc<MockEncodeTool>) -> MediaOps {
    MediaOps::new(encoder, EncodeConfig::default(), 1920, 1080, 25)
}

#[tokio::test]
async fn test_assemble_withOneExhaustedChunk_shouldMergeRemainingSegmentsInOrder() {
    let dir = common::create_temp_dir().unwrap();
    let synthesizer = Arc::new(MockSynthesizer::failing_on("FAIL"));
    let stage = SpeechSynthesisStage::new(synthesizer.clone(), &fast_synthesis());
    let chunks = vec![
        chunk(0, "First part of the story.", Language::English),
        chunk(1, "FAIL this part never renders.", Language::English),
        chunk(2, "Last part of the story.", Language::English),
    ];

    let output = stage
        .synthesize_unit(&chunks, &VoiceSelection::default(), "-5%", &dir.path().join("chunks"))
        .await
        .unwrap();

    assert_eq!(output.segments.len(), 2);
    assert_eq!(output.failures.len(), 1);
    assert!(matches!(output.failures[0], SynthesisError::ExhaustedRetries { chunk: 1, attempts: 3, .. }));
    assert_eq!(output.attempts, vec![1, 3, 1]);
    assert_eq!(synthesizer.request_count(), 5);

    let encoder = Arc::new(MockEncodeTool::new(12.0));
    let voice = dir.path().join("voice.mp3");
    let size = AudioAssembler::new(media(encoder.clone()), 100).assemble(&output.segments, &voice).await.unwrap();
    assert!(size > 0);

    let lists = encoder.concat_lists.lock().unwrap();
    assert_eq!(lists.len(), 1);
    let first = lists[0].find("chunk_000.mp3").unwrap();
    let last = lists[0].find("chunk_002.mp3").unwrap();
    assert!(first < last);
    assert!(!lists[0].contains("chunk_001.mp3"));
    assert!(output.segments.iter().all(|s| !s.path.exists()));
}

#[tokio::test]
async fn test_assemble_withSingleSegment_shouldCopyWithoutEncoder() {
    let dir = common::create_temp_dir().unwrap();
    let stage = SpeechSynthesisStage::new(Arc::new(MockSynthesizer::new()), &fast_synthesis());
    let output = stage
        .synthesize_unit(&[chunk(0, "Only one chunk here.", Language::English)], &VoiceSelection::default(), "+0%", dir.path())
        .await
        .unwrap();

    let encoder = Arc::new(MockEncodeTool::new(3.0));
    let voice = dir.path().join("voice.mp3");
    let size = AudioAssembler::new(media(encoder.clone()), 100).assemble(&output.segments, &voice).await.unwrap();

    assert_eq!(size, 4096);
    assert!(encoder.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_assemble_withNoValidSegments_shouldReportMissingResource() {
    let dir = common::create_temp_dir().unwrap();
    let stage = SpeechSynthesisStage::new(Arc::new(MockSynthesizer::failing_on("FAIL")), &fast_synthesis());
    let output = stage
        .synthesize_unit(&[chunk(0, "FAIL always", Language::English)], &VoiceSelection::default(), "+0%", dir.path())
        .await
        .unwrap();
    assert!(!output.has_audio());

    let encoder = Arc::new(MockEncodeTool::new(3.0));
    let result = AudioAssembler::new(media(encoder), 100).assemble(&output.segments, &dir.path().join("voice.mp3")).await;
    assert!(matches!(result, Err(PipelineError::ResourceMissing(_))));
}

#[tokio::test]
async fn test_synthesize_withMixedLanguages_shouldUseVoicePerChunk() {
    let dir = common::create_temp_dir().unwrap();
    let synthesizer = Arc::new(MockSynthesizer::new());
    let stage = SpeechSynthesisStage::new(synthesizer.clone(), &fast_synthesis());
    let chunks = vec![
        chunk(0, "Good morning everyone.", Language::English),
        chunk(1, "Buenos días a todos.", Language::Spanish),
        chunk(2, "Welcome back.", Language::English),
    ];

    let output = stage.synthesize_unit(&chunks, &VoiceSelection::default(), "-5%", dir.path()).await.unwrap();

    let voices: Vec<String> = synthesizer.requests.lock().unwrap().iter().map(|r| r.voice_id.clone()).collect();
    assert_eq!(voices, vec!["en-US-AriaNeural", "es-ES-ElviraNeural", "en-US-AriaNeural"]);
    assert_eq!(output.language_switches, 2);
}
