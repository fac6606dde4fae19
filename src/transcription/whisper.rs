use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::errors::{MediaError, TranscriptionError};
use crate::language_utils::Language;
use crate::media::{check_status, run_command};
use crate::transcription::{ModelLoader, TranscriptSegment, TranscriptionModel};

/// Upper bound for one CLI invocation; the stage applies its own timeout on top
const CLI_TIMEOUT: Duration = Duration::from_secs(3600);

/// How long the availability check may take
const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<TranscriptSegment>,
}

/// Transcription through the `whisper` command line tool.
///
/// Each instance owns a private scratch directory for the JSON output, so two
/// instances never read each other's results.
#[derive(Debug)]
pub struct WhisperCli {
    path: String,
    model: String,
    work_dir: TempDir,
}

impl WhisperCli {
    fn arguments(&self, audio: &Path, language: Language) -> Vec<String> {
        vec![
            audio.to_string_lossy().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--language".to_string(),
            language.code().to_string(),
            "--task".to_string(),
            "transcribe".to_string(),
            "--word_timestamps".to_string(),
            "True".to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            self.work_dir.path().to_string_lossy().to_string(),
            "--fp16".to_string(),
            "False".to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ]
    }

    fn output_path(&self, audio: &Path) -> PathBuf {
        let stem = audio.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "audio".to_string());
        self.work_dir.path().join(format!("{}.json", stem))
    }
}

/// Parse whisper's JSON output into ordered segments
pub fn parse_whisper_json(content: &str) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
    let output: WhisperOutput =
        serde_json::from_str(content).map_err(|e| TranscriptionError::Engine(format!("unreadable transcript: {}", e)))?;

    let mut segments = output.segments;
    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    Ok(segments)
}

#[async_trait]
impl TranscriptionModel for WhisperCli {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn transcribe(&self, audio: &Path, language: Language) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
        info!("Running whisper ({}) on {:?} forcing {}", self.model, audio.file_name().unwrap_or_default(), language.name());

        let output = run_command(&self.path, &self.arguments(audio, language), CLI_TIMEOUT)
            .await
            .map_err(|e| match e {
                MediaError::Timeout { timeout, .. } => TranscriptionError::Timeout(timeout),
                other => TranscriptionError::Engine(other.to_string()),
            })?;
        check_status(&self.path, &output).map_err(|e| TranscriptionError::Engine(e.to_string()))?;

        let json_path = self.output_path(audio);
        let content = tokio::fs::read_to_string(&json_path)
            .await
            .map_err(|e| TranscriptionError::Engine(format!("missing transcript {:?}: {}", json_path, e)))?;
        let _ = tokio::fs::remove_file(&json_path).await;

        let segments = parse_whisper_json(&content)?;
        debug!("Whisper produced {} segments", segments.len());
        Ok(segments)
    }
}

/// Creates an independent `WhisperCli` per video unit
#[derive(Debug, Clone)]
pub struct WhisperCliLoader {
    path: String,
    model: String,
}

impl WhisperCliLoader {
    pub fn new(path: impl Into<String>, model: impl Into<String>) -> Self {
        Self { path: path.into(), model: model.into() }
    }
}

#[async_trait]
impl ModelLoader for WhisperCliLoader {
    async fn load(&self) -> Result<Box<dyn TranscriptionModel>, TranscriptionError> {
        let output = run_command(&self.path, &["--help".to_string()], CHECK_TIMEOUT)
            .await
            .map_err(|e| TranscriptionError::ModelLoad(e.to_string()))?;
        check_status(&self.path, &output).map_err(|e| TranscriptionError::ModelLoad(e.to_string()))?;

        let work_dir = tempfile::Builder::new()
            .prefix("slidecast-whisper-")
            .tempdir()
            .map_err(|e| TranscriptionError::ModelLoad(format!("failed to create scratch directory: {}", e)))?;

        Ok(Box::new(WhisperCli { path: self.path.clone(), model: self.model.clone(), work_dir }))
    }
}
