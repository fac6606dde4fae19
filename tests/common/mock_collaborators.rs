/*!
 * Mock collaborator implementations for testing
 *
 * The mocks stand in for the speech backend, the transcription engine and
 * the encode tool so the full pipeline can run without external programs.
 * Each mock records what it was asked to do.
 */

use async_trait::async_trait;
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use slidecast::errors::{MediaError, SynthesisError, TranscriptionError};
use slidecast::language_utils::Language;
use slidecast::media::{EncodeTool, FrameSink};
use slidecast::speech::{SpeechSynthesizer, SynthesisRequest};
use slidecast::transcription::{ModelLoader, TranscriptSegment, TranscriptionModel, WordSpan};

/// Writes a fixed-size file per request; texts containing a failure marker always fail
#[derive(Debug)]
pub struct MockSynthesizer {
    audio_bytes: usize,
    fail_marker: Option<String>,
    pub requests: Mutex<Vec<SynthesisRequest>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self { audio_bytes: 4096, fail_marker: None, requests: Mutex::new(Vec::new()) }
    }

    /// Fail every request whose text contains `marker`
    pub fn failing_on(marker: &str) -> Self {
        Self { fail_marker: Some(marker.to_string()), ..Self::new() }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest, output: &Path) -> Result<(), SynthesisError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(marker) = &self.fail_marker {
            if request.text.contains(marker.as_str()) {
                return Err(SynthesisError::Transient("mock backend refused".to_string()));
            }
        }
        fs::write(output, vec![7u8; self.audio_bytes])?;
        Ok(())
    }
}

/// Model answering with a canned transcript in the forced language
#[derive(Debug)]
pub struct MockModel {
    instance: usize,
    languages: std::sync::Arc<Mutex<Vec<(usize, Language)>>>,
}

fn canned_transcript(language: Language) -> &'static str {
    match language {
        Language::English => "the river runs through the old town and the market opens",
        Language::Spanish => "el río pasa por la ciudad y el mercado abre con pan",
    }
}

#[async_trait]
impl TranscriptionModel for MockModel {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn transcribe(&self, _audio: &Path, language: Language) -> Result<Vec<TranscriptSegment>, TranscriptionError> {
        self.languages.lock().unwrap().push((self.instance, language));
        let text = canned_transcript(language);
        let words = text
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| WordSpan { word: format!(" {}", w), start: i as f64 * 0.4, end: i as f64 * 0.4 + 0.35 })
            .collect::<Vec<_>>();
        let end = words.last().map(|w| w.end).unwrap_or(0.0);
        Ok(vec![TranscriptSegment { start: 0.0, end, text: text.to_string(), words }])
    }
}

/// Hands out numbered model instances and records which one ran with which language
#[derive(Debug, Default)]
pub struct MockModelLoader {
    loads: AtomicUsize,
    pub languages: std::sync::Arc<Mutex<Vec<(usize, Language)>>>,
}

impl MockModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// (model instance, forced language) per transcription call
    pub fn calls(&self) -> Vec<(usize, Language)> {
        self.languages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelLoader for MockModelLoader {
    async fn load(&self) -> Result<Box<dyn TranscriptionModel>, TranscriptionError> {
        let instance = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockModel { instance, languages: self.languages.clone() }))
    }
}

/// Encode tool that writes its output argument instead of encoding
#[derive(Debug)]
pub struct MockEncodeTool {
    duration: f64,
    fail_marker: Mutex<Option<String>>,
    pub calls: Mutex<Vec<Vec<String>>>,
    pub concat_lists: Mutex<Vec<String>>,
    pub frames: std::sync::Arc<AtomicUsize>,
}

impl MockEncodeTool {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            fail_marker: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            concat_lists: Mutex::new(Vec::new()),
            frames: std::sync::Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every run whose arguments contain `marker`
    pub fn fail_when(&self, marker: &str) {
        *self.fail_marker.lock().unwrap() = Some(marker.to_string());
    }

    /// Recorded runs whose arguments contain `needle`
    pub fn calls_containing(&self, needle: &str) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|args| args.iter().any(|a| a.contains(needle)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EncodeTool for MockEncodeTool {
    async fn run(&self, args: &[String], _timeout: Duration) -> Result<(), MediaError> {
        self.calls.lock().unwrap().push(args.to_vec());

        if let Some(marker) = self.fail_marker.lock().unwrap().as_deref() {
            if args.iter().any(|a| a.contains(marker)) {
                return Err(MediaError::ToolFailed {
                    tool: "mock-ffmpeg".to_string(),
                    status: 1,
                    stderr: format!("refused {}", marker),
                });
            }
        }

        if args.windows(2).any(|w| w[0] == "-f" && w[1] == "concat") {
            if let Some(i) = args.iter().position(|a| a == "-i") {
                let list = fs::read_to_string(&args[i + 1])?;
                self.concat_lists.lock().unwrap().push(list);
            }
        }

        let output = PathBuf::from(args.last().cloned().unwrap_or_default());
        fs::write(output, b"mock media output")?;
        Ok(())
    }

    async fn probe(&self, args: &[String]) -> Result<String, MediaError> {
        if args.iter().any(|a| a == "-show_streams") {
            return Ok(format!(
                r#"{{"streams":[{{"codec_type":"video","width":1920,"height":1080,"duration":"{}"}}]}}"#,
                self.duration
            ));
        }
        Ok(format!("{}\n", self.duration))
    }

    async fn open_frame_sink(
        &self,
        output: &Path,
        width: u32,
        height: u32,
        _fps: u32,
    ) -> Result<Box<dyn FrameSink>, MediaError> {
        Ok(Box::new(CountingSink {
            output: output.to_path_buf(),
            size: (width, height),
            written: 0,
            total: self.frames.clone(),
        }))
    }
}

/// Counts frames and writes a placeholder file on finish
pub struct CountingSink {
    output: PathBuf,
    size: (u32, u32),
    written: u64,
    total: std::sync::Arc<AtomicUsize>,
}

#[async_trait]
impl FrameSink for CountingSink {
    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), MediaError> {
        if frame.dimensions() != self.size {
            return Err(MediaError::FramePipe(format!("unexpected frame size {:?}", frame.dimensions())));
        }
        self.written += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<u64, MediaError> {
        fs::write(&self.output, b"mock slideshow")?;
        Ok(self.written)
    }
}
