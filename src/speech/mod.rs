/*!
 * Narration synthesis.
 *
 * - `synthesis`: per-unit, strictly sequential chunk synthesis with voice
 *   selection, stabilization pauses and retry
 * - `assembler`: joins the valid chunk audio into the unit's narration file
 * - `edge_tts`: the default backend, driving the `edge-tts` command line tool
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

use crate::errors::SynthesisError;

pub mod assembler;
pub mod edge_tts;
pub mod synthesis;

pub use assembler::AudioAssembler;
pub use edge_tts::EdgeTts;
pub use synthesis::{AudioSegment, SpeechSynthesisStage, SynthesisOutput, SynthesisState};

/// One call to the speech backend
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Text to speak
    pub text: String,
    /// Backend voice identifier, e.g. `en-US-AriaNeural`
    pub voice_id: String,
    /// Rate adjustment, e.g. `-5%`
    pub rate: String,
}

/// The speech synthesis collaborator
///
/// Writes the audio for one request to `output`. The caller applies the
/// timeout and checks the produced file's size.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + Debug {
    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> Result<(), SynthesisError>;
}
