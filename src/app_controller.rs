use anyhow::{Context, Result, anyhow};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, TransitionPreset, UnitConfig};
use crate::errors::{MediaError, PipelineError};
use crate::file_utils::{FileManager, UnitLayout, discover_units};
use crate::media::{ConcatStrategy, EncodeTool, FfmpegTool, MediaOps};
use crate::motion::MotionEngine;
use crate::progress::{PipelineStage, ProgressCallback, ProgressTracker};
use crate::slideshow::{FrameRenderer, ImagePreprocessor, SlidePlanner};
use crate::speech::{AudioAssembler, EdgeTts, SpeechSynthesisStage, SpeechSynthesizer};
use crate::subtitle_styler::{CaptionPosition, CaptionPresetKey, SubtitleStyler};
use crate::text_chunker::TextChunker;
use crate::transcription::{ModelLoader, TranscriptionStage, WhisperCliLoader};

// @module: Application controller for slideshow production

/// Batch log written next to the unit folders
pub const BATCH_LOG_FILE: &str = "slidecast.log";

/// External collaborators used by the pipeline
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub model_loader: Arc<dyn ModelLoader>,
    pub encoder: Arc<dyn EncodeTool>,
}

impl Collaborators {
    /// edge-tts, whisper and ffmpeg, as configured
    pub fn from_config(config: &Config) -> Self {
        Self {
            synthesizer: Arc::new(EdgeTts::new(config.synthesis.edge_tts_path.clone())),
            model_loader: Arc::new(WhisperCliLoader::new(
                config.transcription.whisper_path.clone(),
                config.transcription.model.clone(),
            )),
            encoder: Arc::new(FfmpegTool::new(&config.encode)),
        }
    }
}

/// Where a unit's captions come from
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionSource {
    /// A caption file already present in the unit folder
    Existing(PathBuf),
    /// Transcribe the narration and style it with a preset
    Generated { preset: CaptionPresetKey, position: CaptionPosition },
}

/// Artifacts of a successful unit
#[derive(Debug, Clone)]
pub struct UnitArtifacts {
    pub output: PathBuf,
    pub duration: f64,
    pub captions: CaptionSource,
    pub transition: TransitionPreset,
    pub concat: ConcatStrategy,
    /// Transcription passes, when captions were generated
    pub transcription_passes: Option<u32>,
}

/// Pass/fail result of one unit
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub name: String,
    pub success: bool,
    pub reason: Option<String>,
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
    pub transition: Option<TransitionPreset>,
}

/// Outcomes of a batch, in processing order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<UnitOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn summary(&self) -> String {
        format!("Success: {}/{}", self.succeeded(), self.outcomes.len())
    }
}

/// Format duration in a human-readable format
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}

/// Main application controller.
///
/// Units run strictly one after another. Every unit builds its own
/// synthesis state and transcription model; only the unit counter
/// survives between units, and it only feeds the random draws.
pub struct Controller {
    // @field: App configuration
    config: Config,
    collaborators: Collaborators,
    unit_counter: u64,
    progress: Option<ProgressCallback>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config, collaborators, unit_counter: 0, progress: None })
    }

    /// Receive stage progress for every unit
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Units started so far
    pub fn unit_counter(&self) -> u64 {
        self.unit_counter
    }

    /// Process every `video_<N>` folder under `root`.
    ///
    /// `on_unit` receives (finished units, total units). A failing unit is
    /// reported and the batch moves on.
    pub async fn run_batch(&mut self, root: &Path, on_unit: impl Fn(usize, usize)) -> Result<BatchReport> {
        let start = Instant::now();
        let units = discover_units(root)?;
        if units.is_empty() {
            return Err(anyhow!("No video_<N> folders found in {:?}", root));
        }
        info!("Found {} video units in {:?}", units.len(), root);

        let mut report = BatchReport::default();
        for (index, layout) in units.iter().enumerate() {
            info!("Processing unit {}/{}: {}", index + 1, units.len(), layout.name());
            let outcome = self.run_unit(&layout.root).await;
            report.outcomes.push(outcome);
            on_unit(index + 1, units.len());
        }
        report.elapsed = start.elapsed();

        let summary = format!("{} ({})", report.summary(), format_duration(report.elapsed));
        info!("{}", summary);
        for outcome in report.outcomes.iter().filter(|o| !o.success) {
            warn!("{} failed: {}", outcome.name, outcome.reason.as_deref().unwrap_or("unknown"));
        }

        let log_path = root.join(BATCH_LOG_FILE);
        let mut lines = vec![summary];
        lines.extend(report.outcomes.iter().map(|o| match (&o.output, &o.reason) {
            (Some(output), _) => format!("{}: ok {:?} ({})", o.name, output, format_duration(o.elapsed)),
            (None, reason) => format!("{}: failed {}", o.name, reason.as_deref().unwrap_or("unknown")),
        }));
        if let Err(e) = FileManager::append_to_log_file(&log_path, &lines.join("\n")) {
            warn!("Failed to write batch log: {}", e);
        }

        Ok(report)
    }

    /// Process one unit folder; never fails, the outcome carries the reason
    pub async fn run_unit(&mut self, unit_dir: &Path) -> UnitOutcome {
        self.unit_counter += 1;
        let layout = UnitLayout::new(unit_dir);
        let name = layout.name();
        let start = Instant::now();

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.unit_counter)),
            None => StdRng::from_os_rng(),
        };

        let result = match UnitConfig::load(&layout.root, &self.config.unit_defaults) {
            Ok(unit) => self.produce(&layout, &unit, &mut rng).await,
            Err(e) => Err(PipelineError::Config(format!("{:#}", e))),
        };
        let elapsed = start.elapsed();

        match result {
            Ok(artifacts) => {
                info!(
                    "Success: {} -> {:?} ({:.1}s of video in {})",
                    name,
                    artifacts.output,
                    artifacts.duration,
                    format_duration(elapsed)
                );
                UnitOutcome {
                    name,
                    success: true,
                    reason: None,
                    output: Some(artifacts.output),
                    elapsed,
                    transition: Some(artifacts.transition),
                }
            }
            Err(e) => {
                error!("Unit {} failed: {}", name, e);
                UnitOutcome { name, success: false, reason: Some(e.to_string()), output: None, elapsed, transition: None }
            }
        }
    }

    /// Existing caption file or a preset, drawn from `rng` when unset or when randomizing
    pub fn choose_captions<R: Rng + ?Sized>(&self, layout: &UnitLayout, unit: &UnitConfig, rng: &mut R) -> Result<CaptionSource> {
        let existing = layout.caption_files()?;
        if !existing.is_empty() {
            let chosen = existing[rng.random_range(0..existing.len())].clone();
            info!("Using existing caption file {:?} ({} available)", chosen, existing.len());
            return Ok(CaptionSource::Existing(chosen));
        }

        let force_random = self.unit_counter > 1 && unit.randomize_captions;
        let preset = match unit.subtitle_preset {
            Some(preset) if !force_random => preset,
            _ => CaptionPresetKey::ALL[rng.random_range(0..CaptionPresetKey::ALL.len())],
        };
        let position = match unit.subtitle_position {
            Some(position) if !force_random => position,
            _ => CaptionPosition::ALL[rng.random_range(0..CaptionPosition::ALL.len())],
        };
        info!("Caption style: {} at {}", preset.style().display_name, position.display_name());
        Ok(CaptionSource::Generated { preset, position })
    }

    pub fn choose_transition<R: Rng + ?Sized>(&self, unit: &UnitConfig, rng: &mut R) -> TransitionPreset {
        if unit.random_transitions {
            TransitionPreset::ALL[rng.random_range(0..TransitionPreset::ALL.len())]
        } else {
            unit.transition_preset
        }
    }

    async fn produce(&self, layout: &UnitLayout, unit: &UnitConfig, rng: &mut StdRng) -> Result<UnitArtifacts, PipelineError> {
        let name = layout.name();
        let render = &self.config.render;
        let mut tracker = ProgressTracker::new(name.clone(), self.progress.clone());

        let script = layout
            .script_text()
            .map_err(|e| PipelineError::ResourceMissing(e.to_string()))?;
        if script.trim().is_empty() {
            return Err(PipelineError::ResourceMissing(format!("script in {:?} is empty", layout.text)));
        }
        let images = layout.images()?;
        if images.is_empty() {
            return Err(PipelineError::ResourceMissing(format!("no images in {:?}", layout.images)));
        }
        layout.ensure_output_dirs()?;
        FileManager::remove_if_exists(layout.final_file())?;

        let captions = self.choose_captions(layout, unit, rng)?;
        let transition = self.choose_transition(unit, rng);
        info!("Transition: {} ({}, {:.1}s)", transition.display_name(), transition.kind(), transition.duration_secs());

        let media = MediaOps::new(self.collaborators.encoder.clone(), self.config.encode.clone(), render.width, render.height, render.fps);
        let scratch = tempfile::Builder::new().prefix(".slidecast-").tempdir_in(&layout.output)?;

        // Narration
        tracker.start(PipelineStage::Synthesis);
        let chunks = TextChunker::new(self.config.synthesis.max_chunk_chars).split(&script);
        let synthesis = SpeechSynthesisStage::new(self.collaborators.synthesizer.clone(), &self.config.synthesis);
        let mut spoken = synthesis
            .synthesize_unit(&chunks, &unit.voice_preset, &unit.rate_string(), &scratch.path().join("chunks"))
            .await?;
        if !spoken.has_audio() {
            return Err(match spoken.failures.pop() {
                Some(failure) => failure.into(),
                None => PipelineError::ResourceMissing("no audio was synthesized".to_string()),
            });
        }
        tracker.finish_stage();

        tracker.start(PipelineStage::AudioAssembly);
        let voice_file = layout.voice_file();
        AudioAssembler::new(media.clone(), self.config.synthesis.min_audio_bytes)
            .assemble(&spoken.segments, &voice_file)
            .await?;
        let narration = media.probe_duration(&voice_file).await?;
        if narration <= 0.0 {
            return Err(MediaError::Probe(format!("narration {:?} has no duration", voice_file)).into());
        }
        info!("Narration: {:.2}s", narration);
        tracker.finish_stage();

        // Slideshow
        tracker.start(PipelineStage::Slideshow);
        let mut plan = SlidePlanner::new(render).plan(&images, narration, rng)?;
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        let preprocessor = ImagePreprocessor::new(
            render.width,
            render.height,
            unit.blur_radius,
            unit.image_quality,
            render.worker_count(cpus),
        );
        let prepared = preprocessor.prepare(&plan.unique_images(), tracker.counter(0.0, 0.2)).await;
        if prepared.images.is_empty() {
            return Err(PipelineError::Render("none of the selected images could be prepared".to_string()));
        }
        if !prepared.failed.is_empty() {
            warn!("Dropping {} unreadable image(s) from the plan", prepared.failed.len());
            plan.retain_images(|p| prepared.images.contains_key(p));
        }

        let slideshow_file = layout.slideshow_file();
        let sink = self
            .collaborators
            .encoder
            .open_frame_sink(&slideshow_file, render.width, render.height, render.fps)
            .await?;
        FrameRenderer::new(MotionEngine::new(render.motion))
            .render(&plan, &prepared, sink, tracker.counter(0.2, 1.0))
            .await?;
        crate::media::operations::verify_output(&slideshow_file)?;
        tracker.finish_stage();

        tracker.start(PipelineStage::Merge);
        let merged = scratch.path().join("merged.mp4");
        media.merge_audio_video(&slideshow_file, &voice_file, &merged).await?;
        tracker.finish_stage();

        // Captions
        let mut transcription_passes = None;
        let caption_file = match &captions {
            CaptionSource::Existing(path) => {
                info!("Skipping transcription, burning {:?}", path);
                Some(path.clone())
            }
            CaptionSource::Generated { preset, position } => {
                tracker.start(PipelineStage::Transcription);
                let wav = scratch.path().join("narration.wav");
                media.extract_audio_for_transcription(&merged, &wav).await?;
                let outcome = {
                    let stage = TranscriptionStage::for_unit(
                        self.collaborators.model_loader.as_ref(),
                        &name,
                        self.config.transcription.timeout(),
                    )
                    .await?;
                    stage.transcribe(&wav, &script).await?
                };
                transcription_passes = Some(outcome.passes);
                tracker.finish_stage();

                tracker.start(PipelineStage::Styling);
                let styler = SubtitleStyler::new(
                    self.config.transcription.words_per_cue,
                    self.config.transcription.min_cue_duration,
                    unit.subtitle_offset,
                );
                let document = styler.style(&outcome.segments, *preset, *position);
                tracker.finish_stage();
                if document.cues.is_empty() {
                    warn!("Transcript of {} has no words, skipping captions", name);
                    None
                } else {
                    let path = layout.caption_file();
                    document.write(&path)?;
                    info!("Wrote {} caption cues to {:?}", document.cues.len(), path);
                    Some(path)
                }
            }
        };

        tracker.start(PipelineStage::CaptionOverlay);
        let mut main_video = match caption_file {
            Some(captions_path) => {
                let captioned = scratch.path().join("captioned.mp4");
                media.burn_captions(&merged, &captions_path, &captioned).await?;
                captioned
            }
            None => merged,
        };
        tracker.finish_stage();

        // Final assembly
        tracker.start(PipelineStage::FinalAssembly);
        if unit.enable_webcam {
            if let Some(webcam) = layout.webcam_clip()? {
                match self.apply_webcam(&media, &main_video, &webcam, unit, scratch.path()).await {
                    Ok(with_webcam) => main_video = with_webcam,
                    Err(e) => warn!("Webcam overlay skipped: {}", e),
                }
            }
        }

        let mut components = Vec::with_capacity(3);
        if unit.enable_intro {
            if let Some(intro) = layout.intro_clip()? {
                info!("Adding intro {:?}", intro);
                components.push(intro);
            }
        }
        components.push(main_video);
        if unit.enable_outro {
            if let Some(outro) = layout.outro_clip()? {
                info!("Adding outro {:?}", outro);
                components.push(outro);
            }
        }

        let output = layout.final_file();
        let concat = media.concat_clips(&components, &output).await?;
        let duration = media.probe_duration(&output).await?;
        if duration <= 0.0 {
            return Err(MediaError::InvalidOutput(output).into());
        }
        tracker.finish_stage();

        Ok(UnitArtifacts { output, duration, captions, transition, concat, transcription_passes })
    }

    async fn apply_webcam(
        &self,
        media: &MediaOps,
        main_video: &Path,
        webcam: &Path,
        unit: &UnitConfig,
        scratch: &Path,
    ) -> Result<PathBuf, MediaError> {
        let target = media.probe_duration(main_video).await?;
        let track = scratch.join("webcam.mp4");
        media.build_webcam_track(webcam, target, unit.webcam_size_percent, &track).await?;
        let output = scratch.join("with_webcam.mp4");
        media
            .overlay_webcam(main_video, &track, unit.webcam_size_percent, unit.webcam_position, &output)
            .await?;
        Ok(output)
    }
}
