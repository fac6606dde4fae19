use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{SynthesisConfig, VoiceSelection};
use crate::errors::SynthesisError;
use crate::language_utils::Language;
use crate::retry::{RetryError, RetryPolicy};
use crate::speech::{SpeechSynthesizer, SynthesisRequest};
use crate::text_chunker::TextChunk;

/// Audio produced for one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// Ordinal of the source chunk
    pub ordinal: usize,
    /// Where the audio was written
    pub path: PathBuf,
    /// Size in bytes when the last attempt finished
    pub size: u64,
    /// Whether the size passed the minimum threshold
    pub valid: bool,
}

/// Mutable synthesis bookkeeping for exactly one video unit.
///
/// Created when a unit's synthesis starts and dropped when it ends, so no
/// language or voice memory can leak into the next unit.
#[derive(Debug, Default)]
pub struct SynthesisState {
    last_language: Option<Language>,
    last_voice: Option<String>,
    attempts: Vec<u32>,
    language_switches: usize,
}

impl SynthesisState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether synthesizing in `language` with `voice` is a switch from the previous chunk
    pub fn is_switch(&self, language: Language, voice: &str) -> bool {
        match (&self.last_language, &self.last_voice) {
            (Some(last_language), Some(last_voice)) => *last_language != language || last_voice != voice,
            _ => false,
        }
    }

    /// Whether the backend should settle before this chunk. True for the
    /// first chunk of a unit, since the backend may still hold another voice.
    pub fn needs_pause(&self, language: Language, voice: &str) -> bool {
        self.last_language != Some(language) || self.last_voice.as_deref() != Some(voice)
    }

    /// Remember the language and voice of the chunk about to be synthesized
    pub fn observe(&mut self, language: Language, voice: &str) {
        if self.is_switch(language, voice) {
            self.language_switches += 1;
        }
        self.last_language = Some(language);
        self.last_voice = Some(voice.to_string());
    }

    /// Record how many attempts a chunk took
    pub fn record_attempts(&mut self, attempts: u32) {
        self.attempts.push(attempts);
    }

    pub fn last_language(&self) -> Option<Language> {
        self.last_language
    }

    /// Attempts per chunk, in chunk order
    pub fn attempts(&self) -> &[u32] {
        &self.attempts
    }
}

/// Result of synthesizing one unit's chunks
#[derive(Debug)]
pub struct SynthesisOutput {
    /// One segment per successfully synthesized chunk, in chunk order
    pub segments: Vec<AudioSegment>,
    /// Chunks that exhausted their retries
    pub failures: Vec<SynthesisError>,
    /// Number of language or voice switches between consecutive chunks
    pub language_switches: usize,
    /// Attempts per chunk, in chunk order
    pub attempts: Vec<u32>,
}

impl SynthesisOutput {
    /// Whether at least one chunk produced valid audio
    pub fn has_audio(&self) -> bool {
        self.segments.iter().any(|s| s.valid)
    }
}

/// Turns text chunks into audio files, one chunk at a time
#[derive(Debug, Clone)]
pub struct SpeechSynthesisStage {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    policy: RetryPolicy,
    timeout: Duration,
    min_audio_bytes: u64,
    stabilization_pause: Duration,
}

impl SpeechSynthesisStage {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, config: &SynthesisConfig) -> Self {
        Self {
            synthesizer,
            policy: config.retry_policy(),
            timeout: config.timeout(),
            min_audio_bytes: config.min_audio_bytes,
            stabilization_pause: config.stabilization_pause(),
        }
    }

    /// Synthesize every chunk of a unit in order, writing `chunk_NNN.mp3` files into `work_dir`.
    ///
    /// A chunk that exhausts its retries is recorded in `failures` and the
    /// remaining chunks still run.
    pub async fn synthesize_unit(
        &self,
        chunks: &[TextChunk],
        voices: &VoiceSelection,
        rate: &str,
        work_dir: &Path,
    ) -> Result<SynthesisOutput, SynthesisError> {
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        tokio::fs::create_dir_all(work_dir).await?;

        let mut state = SynthesisState::new();
        let mut segments = Vec::with_capacity(chunks.len());
        let mut failures = Vec::new();

        for chunk in chunks {
            let voice = voices.for_language(chunk.language).voice_id();
            info!(
                "Chunk {}/{}: {} chars, language {}, voice {}",
                chunk.ordinal + 1,
                chunks.len(),
                chunk.text.chars().count(),
                chunk.language.name(),
                voice
            );

            if state.needs_pause(chunk.language, voice) {
                info!("Voice change before chunk {}, pausing {:?}", chunk.ordinal + 1, self.stabilization_pause);
                if !self.stabilization_pause.is_zero() {
                    tokio::time::sleep(self.stabilization_pause).await;
                }
            }
            state.observe(chunk.language, voice);

            let request = SynthesisRequest { text: chunk.text.clone(), voice_id: voice.to_string(), rate: rate.to_string() };
            let path = work_dir.join(format!("chunk_{:03}.mp3", chunk.ordinal));

            match self.synthesize_chunk(&request, &path).await {
                Ok((size, attempts)) => {
                    state.record_attempts(attempts);
                    debug!("Chunk {} ready: {} bytes after {} attempt(s)", chunk.ordinal + 1, size, attempts);
                    segments.push(AudioSegment { ordinal: chunk.ordinal, path, size, valid: true });
                }
                Err(retry_error) => {
                    let attempts = retry_error.attempts();
                    state.record_attempts(attempts);
                    let last_error = retry_error.into_inner();
                    error!("Chunk {} failed after {} attempt(s): {}", chunk.ordinal + 1, attempts, last_error);
                    let _ = tokio::fs::remove_file(&path).await;
                    failures.push(SynthesisError::ExhaustedRetries {
                        chunk: chunk.ordinal,
                        attempts,
                        last_error: last_error.to_string(),
                    });
                }
            }
        }

        info!(
            "Synthesized {}/{} chunks ({} voice switches)",
            segments.len(),
            chunks.len(),
            state.language_switches
        );

        Ok(SynthesisOutput {
            segments,
            failures,
            language_switches: state.language_switches,
            attempts: state.attempts,
        })
    }

    /// Synthesize one chunk under the retry policy; returns (size, attempts)
    async fn synthesize_chunk(&self, request: &SynthesisRequest, path: &Path) -> Result<(u64, u32), RetryError<SynthesisError>> {
        let synthesizer = &self.synthesizer;
        let timeout = self.timeout;
        let minimum = self.min_audio_bytes;
        let mut used = 0u32;

        let size = self
            .policy
            .run(
                |attempt, previous: Option<&SynthesisError>| {
                    if let Some(previous) = previous {
                        warn!("Retrying chunk (attempt {}): {}", attempt, previous);
                    }
                    used = attempt;
                    async move {
                        let _ = tokio::fs::remove_file(path).await;
                        match tokio::time::timeout(timeout, synthesizer.synthesize(request, path)).await {
                            Ok(result) => result?,
                            Err(_) => return Err(SynthesisError::Timeout(timeout)),
                        }
                        Ok(tokio::fs::metadata(path).await?.len())
                    }
                },
                |size: u64| {
                    if size > minimum {
                        Ok(size)
                    } else {
                        let _ = std::fs::remove_file(path);
                        Err(SynthesisError::TooSmallOutput { size, minimum })
                    }
                },
            )
            .await?;

        Ok((size, used))
    }
}
