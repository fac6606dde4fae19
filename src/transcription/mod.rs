/*!
 * Speech-to-text for caption generation.
 *
 * - `stage`: the per-unit transcription stage (forced language, consistency
 *   check, single corrective pass, fresh model handle per unit)
 * - `whisper`: the default backend, driving the `whisper` command line tool
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

use crate::errors::TranscriptionError;
use crate::language_utils::Language;

pub mod stage;
pub mod whisper;

pub use stage::{TranscriptionModelHandle, TranscriptionOutcome, TranscriptionStage};
pub use whisper::{WhisperCli, WhisperCliLoader};

/// One recognized word with its timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSpan {
    /// Recognized word, possibly with surrounding whitespace
    pub word: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

/// One transcript segment with word-level timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Segment text
    pub text: String,
    /// Words in spoken order
    #[serde(default)]
    pub words: Vec<WordSpan>,
}

/// Join the text of all segments
pub fn transcript_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A loaded transcription model
///
/// Implementations always request word-level timestamps and must honor the
/// forced language instead of detecting one themselves.
#[async_trait]
pub trait TranscriptionModel: Send + Sync + Debug {
    /// Name of the loaded model
    fn model_name(&self) -> &str;

    /// Transcribe an audio file, forcing the given language
    async fn transcribe(&self, audio: &Path, language: Language) -> Result<Vec<TranscriptSegment>, TranscriptionError>;
}

/// Produces fresh model instances, one per video unit
#[async_trait]
pub trait ModelLoader: Send + Sync + Debug {
    /// Load a new, independent model instance
    async fn load(&self) -> Result<Box<dyn TranscriptionModel>, TranscriptionError>;
}
