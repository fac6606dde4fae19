/*!
 * Error types for the slidecast pipeline.
 *
 * Each subsystem gets its own error enum, defined with thiserror. Every enum
 * also says whether a failure is worth another attempt, which is what the
 * shared retry policy in `crate::retry` consults.
 */

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::language_utils::Language;
use crate::retry::Retryable;
use crate::transcription::TranscriptSegment;

/// Errors raised while turning a text chunk into speech
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// The backend failed in a way that may succeed on another attempt
    #[error("Speech backend failed: {0}")]
    Transient(String),

    /// The backend did not finish within the per-call timeout
    #[error("Speech synthesis timed out after {0:?}")]
    Timeout(Duration),

    /// Output exists but is too small to be real audio
    #[error("Synthesized audio too small: {size} bytes (minimum {minimum})")]
    TooSmallOutput {
        /// Observed size in bytes
        size: u64,
        /// Required minimum in bytes
        minimum: u64,
    },

    /// Every attempt for a chunk failed
    #[error("Chunk {chunk} failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        /// Ordinal of the failing chunk
        chunk: usize,
        /// Number of attempts made
        attempts: u32,
        /// Message of the final failure
        last_error: String,
    },

    /// Nothing to synthesize
    #[error("Empty text provided for synthesis")]
    EmptyText,

    /// No voice is configured for the detected language
    #[error("No voice configured for language {0}")]
    MissingVoice(Language),

    /// Filesystem error around the produced audio
    #[error("Audio file error: {0}")]
    Io(#[from] std::io::Error),
}

impl Retryable for SynthesisError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            SynthesisError::Transient(_)
                | SynthesisError::Timeout(_)
                | SynthesisError::TooSmallOutput { .. }
                | SynthesisError::Io(_)
        )
    }
}

/// Errors raised by the transcription collaborator or stage
#[derive(Error, Debug)]
pub enum TranscriptionError {
    /// The model could not be loaded
    #[error("Failed to load transcription model: {0}")]
    ModelLoad(String),

    /// The engine crashed or produced unreadable output
    #[error("Transcription engine failed: {0}")]
    Engine(String),

    /// The engine did not finish in time
    #[error("Transcription timed out after {0:?}")]
    Timeout(Duration),

    /// The transcript reads as a different language than the one forced
    #[error("Transcript language mismatch: forced {forced}, transcript reads as {detected}")]
    LanguageMismatch {
        /// Language the engine was forced to use
        forced: Language,
        /// Language detected from the transcript text
        detected: Language,
        /// The transcript that was produced anyway
        segments: Vec<TranscriptSegment>,
    },
}

impl Retryable for TranscriptionError {
    fn is_retryable(&self) -> bool {
        // Engine failures are fatal for the unit; only the language check
        // earns the corrective pass.
        matches!(self, TranscriptionError::LanguageMismatch { .. })
    }
}

/// Errors from the external encode tool
#[derive(Error, Debug)]
pub enum MediaError {
    /// The tool could not be started
    #[error("Failed to launch {tool}: {message}")]
    Spawn {
        /// Executable name
        tool: String,
        /// Launch failure detail
        message: String,
    },

    /// The tool exited with a non-zero status
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        /// Executable name
        tool: String,
        /// Exit status, -1 when killed by a signal
        status: i32,
        /// Filtered stderr tail
        stderr: String,
    },

    /// The tool ran past its timeout and was killed
    #[error("{tool} timed out after {timeout:?}")]
    Timeout {
        /// Executable name
        tool: String,
        /// Timeout that was exceeded
        timeout: Duration,
    },

    /// The tool reported success but the output is missing or empty
    #[error("Output file missing or empty: {0:?}")]
    InvalidOutput(PathBuf),

    /// Probe output could not be understood
    #[error("Failed to probe media: {0}")]
    Probe(String),

    /// Writing raw frames to the encoder failed
    #[error("Frame pipe error: {0}")]
    FramePipe(String),

    /// Scratch or list file handling failed
    #[error("Media file error: {0}")]
    Io(#[from] std::io::Error),
}

impl Retryable for MediaError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Unit-level failure with the stage that caused it
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required input is absent
    #[error("Missing resource: {0}")]
    ResourceMissing(String),

    /// Speech synthesis failed
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Transcription failed
    #[error("Transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    /// The encode tool failed
    #[error("External tool error: {0}")]
    ExternalTool(#[from] MediaError),

    /// Frame preprocessing or rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration problem detected at load time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        false
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Config(error.to_string())
    }
}
