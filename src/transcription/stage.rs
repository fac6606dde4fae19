use log::{debug, info, warn};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::TranscriptionError;
use crate::language_utils::{Language, detect_language};
use crate::retry::{RetryError, RetryPolicy};
use crate::transcription::{ModelLoader, TranscriptSegment, TranscriptionModel, transcript_text};

/// Exclusive owner of a loaded transcription model.
///
/// A handle is acquired for exactly one video unit and dropped when that
/// unit ends; the next unit loads its own. Handles are never shared.
#[derive(Debug)]
pub struct TranscriptionModelHandle {
    id: Uuid,
    unit: String,
    model: Box<dyn TranscriptionModel>,
}

impl TranscriptionModelHandle {
    /// Load a fresh model for a unit
    pub async fn acquire(loader: &dyn ModelLoader, unit: &str) -> Result<Self, TranscriptionError> {
        let model = loader.load().await?;
        let handle = Self { id: Uuid::new_v4(), unit: unit.to_string(), model };
        debug!("Acquired transcription model '{}' ({}) for {}", handle.model.model_name(), handle.id, unit);
        Ok(handle)
    }

    /// Unique identity of this handle
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Unit that owns this handle
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The loaded model
    pub fn model(&self) -> &dyn TranscriptionModel {
        self.model.as_ref()
    }
}

impl Drop for TranscriptionModelHandle {
    fn drop(&mut self) {
        debug!("Released transcription model {} for {}", self.id, self.unit);
    }
}

/// Result of transcribing one unit
#[derive(Debug, Clone)]
pub struct TranscriptionOutcome {
    /// Ordered transcript segments
    pub segments: Vec<TranscriptSegment>,
    /// Language derived from the script and forced on the first pass
    pub forced_language: Language,
    /// Language used by the pass whose transcript was kept
    pub final_language: Language,
    /// Number of transcription passes run (1 or 2)
    pub passes: u32,
    /// Whether the kept transcript still reads as another language
    pub mismatch_accepted: bool,
    /// Identity of the model handle that produced the transcript
    pub model_id: Uuid,
}

/// Per-unit transcription stage.
///
/// Forces the language detected from the script, checks the transcript's own
/// language, and runs at most one corrective pass with the re-derived
/// language. A second mismatch is accepted as final.
#[derive(Debug)]
pub struct TranscriptionStage {
    handle: TranscriptionModelHandle,
    timeout: Duration,
    policy: RetryPolicy,
}

impl TranscriptionStage {
    /// Build the stage for one unit, loading a fresh model
    pub async fn for_unit(loader: &dyn ModelLoader, unit: &str, timeout: Duration) -> Result<Self, TranscriptionError> {
        let handle = TranscriptionModelHandle::acquire(loader, unit).await?;
        Ok(Self { handle, timeout, policy: RetryPolicy::single_correction() })
    }

    /// Identity of the model handle owned by this stage
    pub fn model_id(&self) -> Uuid {
        self.handle.id()
    }

    /// Transcribe the unit's narration
    pub async fn transcribe(&self, audio: &Path, script_text: &str) -> Result<TranscriptionOutcome, TranscriptionError> {
        let forced_language = detect_language(script_text);
        info!("Transcribing {} with forced language: {}", self.handle.unit(), forced_language.name());

        let model = self.handle.model();
        let timeout = self.timeout;
        let mut passes = 0u32;

        let result = self
            .policy
            .run(
                |_attempt, previous: Option<&TranscriptionError>| {
                    let language = match previous {
                        Some(TranscriptionError::LanguageMismatch { detected, .. }) => *detected,
                        _ => forced_language,
                    };
                    passes += 1;
                    async move {
                        let segments = match tokio::time::timeout(timeout, model.transcribe(audio, language)).await {
                            Ok(result) => result?,
                            Err(_) => return Err(TranscriptionError::Timeout(timeout)),
                        };
                        Ok((language, segments))
                    }
                },
                |(language, segments): (Language, Vec<TranscriptSegment>)| {
                    let detected = detect_language(&transcript_text(&segments));
                    if detected == language {
                        Ok((language, segments))
                    } else {
                        warn!("Transcript reads as {} while {} was forced", detected.name(), language.name());
                        Err(TranscriptionError::LanguageMismatch { forced: language, detected, segments })
                    }
                },
            )
            .await;

        let (final_language, segments, mismatch_accepted) = match result {
            Ok((language, segments)) => (language, segments, false),
            Err(RetryError::Exhausted { last: TranscriptionError::LanguageMismatch { forced, segments, .. }, .. }) => {
                warn!("Language still mismatched after corrective pass, keeping {} transcript", forced.name());
                (forced, segments, true)
            }
            Err(error) => return Err(error.into_inner()),
        };

        if final_language != forced_language {
            info!("Re-transcribed {} as {}", self.handle.unit(), final_language.name());
        }

        Ok(TranscriptionOutcome {
            segments,
            forced_language,
            final_language,
            passes,
            mismatch_accepted,
            model_id: self.handle.id(),
        })
    }
}
