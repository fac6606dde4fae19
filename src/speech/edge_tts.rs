use async_trait::async_trait;
use log::debug;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::errors::{MediaError, SynthesisError};
use crate::media::{check_status, run_command};
use crate::speech::{SpeechSynthesizer, SynthesisRequest};

/// Hard limit for one CLI call; the synthesis stage applies the configured timeout
const CLI_TIMEOUT: Duration = Duration::from_secs(600);

/// Speech backend driving the `edge-tts` executable
#[derive(Debug, Clone)]
pub struct EdgeTts {
    path: String,
}

impl EdgeTts {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn arguments(request: &SynthesisRequest, text_file: &Path, output: &Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            request.voice_id.clone(),
            format!("--rate={}", request.rate),
            "--file".to_string(),
            text_file.to_string_lossy().to_string(),
            "--write-media".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTts {
    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> Result<(), SynthesisError> {
        if request.text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        // Text goes through a file so long chunks never hit argv limits
        let mut text_file = tempfile::Builder::new().prefix("slidecast-tts-").suffix(".txt").tempfile()?;
        text_file.write_all(request.text.as_bytes())?;
        text_file.flush()?;

        let args = Self::arguments(request, text_file.path(), output);
        debug!("edge-tts voice {} rate {}", request.voice_id, request.rate);

        let result = run_command(&self.path, &args, CLI_TIMEOUT).await.and_then(|out| check_status(&self.path, &out));
        match result {
            Ok(()) => Ok(()),
            Err(MediaError::Timeout { timeout, .. }) => Err(SynthesisError::Timeout(timeout)),
            Err(e) => Err(SynthesisError::Transient(e.to_string())),
        }
    }
}
