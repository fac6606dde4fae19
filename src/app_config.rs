use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::language_utils::Language;
use crate::motion::MotionConfig;
use crate::retry::{Backoff, RetryPolicy};
use crate::subtitle_styler::{CaptionPosition, CaptionPresetKey};

/// Application configuration module
/// This module handles the application configuration (`conf.json`) and the
/// per-unit configuration (`config.json` inside each video folder), including
/// loading, validating and saving them. Every preset table is a closed enum,
/// so an unknown key fails when the file is parsed.

/// Name of the per-unit configuration file
pub const UNIT_CONFIG_FILE: &str = "config.json";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Output frame and slideshow settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Speech synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Transcription and caption settings
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// External encode tool settings
    #[serde(default)]
    pub encode: EncodeConfig,

    /// Seed for effect and preset draws, OS entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Per-unit settings used when a unit has no `config.json`
    #[serde(default)]
    pub unit_defaults: UnitConfig,
}

/// Output frame and slideshow settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RenderConfig {
    // @field: Output frame width
    #[serde(default = "default_width")]
    pub width: u32,

    // @field: Output frame height
    #[serde(default = "default_height")]
    pub height: u32,

    // @field: Output frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    // @field: Shortest slide duration in seconds
    #[serde(default = "default_min_slide_secs")]
    pub min_slide_secs: u32,

    // @field: Longest slide duration in seconds
    #[serde(default = "default_max_slide_secs")]
    pub max_slide_secs: u32,

    // @field: Minimum number of slides per unit
    #[serde(default = "default_min_slides")]
    pub min_slides: usize,

    // @field: Upper bound of the preprocessing worker pool
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    // @field: Motion amplitude limits
    #[serde(default)]
    pub motion: MotionConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            min_slide_secs: default_min_slide_secs(),
            max_slide_secs: default_max_slide_secs(),
            min_slides: default_min_slides(),
            max_workers: default_max_workers(),
            motion: MotionConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Preprocessing pool size for the given CPU count
    pub fn worker_count(&self, cpus: usize) -> usize {
        cpus.saturating_sub(1).max(4).min(self.max_workers.max(1))
    }
}

/// Speech synthesis settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    /// Character budget per synthesized chunk
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Attempts per chunk
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single retry delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-call timeout in seconds
    #[serde(default = "default_synthesis_timeout_secs")]
    pub timeout_secs: u64,

    /// Smallest audio file accepted as real output, in bytes
    #[serde(default = "default_min_audio_bytes")]
    pub min_audio_bytes: u64,

    /// Pause inserted on a language or voice switch, in milliseconds
    #[serde(default = "default_stabilization_pause_ms")]
    pub stabilization_pause_ms: u64,

    /// Speech synthesis executable
    #[serde(default = "default_edge_tts_path")]
    pub edge_tts_path: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_secs: default_synthesis_timeout_secs(),
            min_audio_bytes: default_min_audio_bytes(),
            stabilization_pause_ms: default_stabilization_pause_ms(),
            edge_tts_path: default_edge_tts_path(),
        }
    }
}

impl SynthesisConfig {
    /// Retry policy for one chunk
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Backoff::Exponential {
                base: Duration::from_millis(self.base_delay_ms),
                max: Duration::from_millis(self.max_delay_ms),
            },
        )
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pause inserted on a language or voice switch
    pub fn stabilization_pause(&self) -> Duration {
        Duration::from_millis(self.stabilization_pause_ms)
    }
}

/// Transcription and caption settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    /// Whisper model name
    #[serde(default = "default_whisper_model")]
    pub model: String,

    /// Transcription executable
    #[serde(default = "default_whisper_path")]
    pub whisper_path: String,

    /// Timeout for one transcription pass, in seconds
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,

    /// Words grouped into one caption cue
    #[serde(default = "default_words_per_cue")]
    pub words_per_cue: usize,

    /// Shortest allowed cue, in seconds
    #[serde(default = "default_min_cue_duration")]
    pub min_cue_duration: f64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: default_whisper_model(),
            whisper_path: default_whisper_path(),
            timeout_secs: default_transcription_timeout_secs(),
            words_per_cue: default_words_per_cue(),
            min_cue_duration: default_min_cue_duration(),
        }
    }
}

impl TranscriptionConfig {
    /// Timeout for one transcription pass
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External encode tool settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncodeConfig {
    /// Encoder executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Probe executable
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Timeout for short operations, in seconds
    #[serde(default = "default_encode_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for full-length encodes, in seconds
    #[serde(default = "default_long_timeout_secs")]
    pub long_timeout_secs: u64,

    /// Frame rate of the webcam track
    #[serde(default = "default_webcam_fps")]
    pub webcam_fps: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_encode_timeout_secs(),
            long_timeout_secs: default_long_timeout_secs(),
            webcam_fps: default_webcam_fps(),
        }
    }
}

impl EncodeConfig {
    /// Timeout for short operations
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout for full-length encodes
    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.long_timeout_secs)
    }
}

/// Narration voice preset
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VoicePreset {
    AriaStandard,
    JennyFriendly,
    MichelleProfessional,
    AnaWarm,
    GuyConfident,
    DavisNarrative,
    ElviraElegant,
    AbrilYouthful,
    DaliaMexican,
    RenataMature,
    JorgeMasculine,
    LibertoDeep,
}

impl VoicePreset {
    /// Backend voice identifier
    pub fn voice_id(&self) -> &'static str {
        match self {
            Self::AriaStandard => "en-US-AriaNeural",
            Self::JennyFriendly => "en-US-JennyNeural",
            Self::MichelleProfessional => "en-US-MichelleNeural",
            Self::AnaWarm => "en-US-AnaNeural",
            Self::GuyConfident => "en-US-GuyNeural",
            Self::DavisNarrative => "en-US-DavisNeural",
            Self::ElviraElegant => "es-ES-ElviraNeural",
            Self::AbrilYouthful => "es-ES-AbrilNeural",
            Self::DaliaMexican => "es-MX-DaliaNeural",
            Self::RenataMature => "es-MX-RenataNeural",
            Self::JorgeMasculine => "es-MX-JorgeNeural",
            Self::LibertoDeep => "es-MX-LibertoNeural",
        }
    }

    /// Language the voice speaks
    pub fn language(&self) -> Language {
        match self {
            Self::AriaStandard
            | Self::JennyFriendly
            | Self::MichelleProfessional
            | Self::AnaWarm
            | Self::GuyConfident
            | Self::DavisNarrative => Language::English,
            _ => Language::Spanish,
        }
    }
}

/// Voice preset per narration language
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VoiceSelection {
    #[serde(default = "default_english_voice")]
    pub en: VoicePreset,
    #[serde(default = "default_spanish_voice")]
    pub es: VoicePreset,
}

impl Default for VoiceSelection {
    fn default() -> Self {
        Self { en: default_english_voice(), es: default_spanish_voice() }
    }
}

impl VoiceSelection {
    /// Voice preset for a language
    pub fn for_language(&self, language: Language) -> VoicePreset {
        match language {
            Language::English => self.en,
            Language::Spanish => self.es,
        }
    }
}

/// Transition preset applied between bookend clips
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPreset {
    #[default]
    SmoothFade,
    QuickCut,
    CinematicSlow,
    CrossfadeMedium,
    CrossfadeFast,
    DissolveGentle,
    WipeLeft,
    WipeRight,
    SlideUp,
    SlideDown,
    RadialZoom,
    SpiralEffect,
}

impl TransitionPreset {
    /// All transition presets
    pub const ALL: [TransitionPreset; 12] = [
        Self::SmoothFade,
        Self::QuickCut,
        Self::CinematicSlow,
        Self::CrossfadeMedium,
        Self::CrossfadeFast,
        Self::DissolveGentle,
        Self::WipeLeft,
        Self::WipeRight,
        Self::SlideUp,
        Self::SlideDown,
        Self::RadialZoom,
        Self::SpiralEffect,
    ];

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SmoothFade => "Smooth Fade",
            Self::QuickCut => "Quick Cut",
            Self::CinematicSlow => "Cinematic Slow",
            Self::CrossfadeMedium => "Crossfade Medium",
            Self::CrossfadeFast => "Crossfade Fast",
            Self::DissolveGentle => "Dissolve Gentle",
            Self::WipeLeft => "Wipe Left",
            Self::WipeRight => "Wipe Right",
            Self::SlideUp => "Slide Up",
            Self::SlideDown => "Slide Down",
            Self::RadialZoom => "Radial Zoom",
            Self::SpiralEffect => "Spiral Effect",
        }
    }

    /// Encoder transition kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SmoothFade | Self::QuickCut | Self::CinematicSlow => "fade",
            Self::CrossfadeMedium | Self::CrossfadeFast => "crossfade",
            Self::DissolveGentle => "dissolve",
            Self::WipeLeft => "wipeleft",
            Self::WipeRight => "wiperight",
            Self::SlideUp => "slideup",
            Self::SlideDown => "slidedown",
            Self::RadialZoom => "radial",
            Self::SpiralEffect => "spiral",
        }
    }

    /// Transition duration in seconds
    pub fn duration_secs(&self) -> f64 {
        match self {
            Self::SmoothFade => 0.8,
            Self::QuickCut => 0.2,
            Self::CinematicSlow => 1.5,
            Self::CrossfadeMedium => 1.0,
            Self::CrossfadeFast => 0.5,
            Self::DissolveGentle => 1.2,
            Self::WipeLeft | Self::WipeRight => 0.7,
            Self::SlideUp | Self::SlideDown => 0.9,
            Self::RadialZoom => 1.0,
            Self::SpiralEffect => 1.3,
        }
    }
}

/// Corner used for the webcam overlay
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WebcamPosition {
    #[default]
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

impl WebcamPosition {
    /// Top-left corner of an overlay of `overlay` size inside a `frame`
    pub fn origin(&self, frame: (u32, u32), overlay: (u32, u32)) -> (u32, u32) {
        let right = frame.0.saturating_sub(overlay.0);
        let bottom = frame.1.saturating_sub(overlay.1);
        match self {
            Self::BottomLeft => (0, bottom),
            Self::BottomRight => (right, bottom),
            Self::TopLeft => (0, 0),
            Self::TopRight => (right, 0),
        }
    }
}

/// Image preprocessing quality
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    High,
    #[default]
    Balanced,
    Fast,
}

impl ImageQuality {
    /// Downscale factor applied before blurring
    pub fn reduction_factor(&self) -> f32 {
        match self {
            Self::High => 0.7,
            Self::Balanced => 0.8,
            Self::Fast => 0.9,
        }
    }
}

/// Per-unit configuration (`config.json` in a video folder)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnitConfig {
    /// Voice preset per narration language
    #[serde(default)]
    pub voice_preset: VoiceSelection,

    /// Speech rate multiplier
    #[serde(default = "default_speed", alias = "speech_rate")]
    pub speed: f64,

    /// Caption preset, drawn at random when null
    #[serde(default = "default_subtitle_preset")]
    pub subtitle_preset: Option<CaptionPresetKey>,

    /// Caption position, drawn at random when null
    #[serde(default = "default_subtitle_position")]
    pub subtitle_position: Option<CaptionPosition>,

    /// Seconds added to every caption time
    #[serde(default)]
    pub subtitle_offset: f64,

    /// Draw a fresh caption preset for every unit after the first in a batch
    #[serde(default = "default_true")]
    pub randomize_captions: bool,

    /// Gaussian blur radius applied to slides
    #[serde(default = "default_blur_radius")]
    pub blur_radius: u32,

    /// Transition preset for the final assembly
    #[serde(default)]
    pub transition_preset: TransitionPreset,

    /// Draw a transition preset per unit
    #[serde(default = "default_true")]
    pub random_transitions: bool,

    /// Image preprocessing quality
    #[serde(default)]
    pub image_quality: ImageQuality,

    /// Prepend the intro clip when present
    #[serde(default = "default_true")]
    pub enable_intro: bool,

    /// Append the outro clip when present
    #[serde(default = "default_true")]
    pub enable_outro: bool,

    /// Overlay the webcam clip when present
    #[serde(default = "default_true", alias = "enable_auth")]
    pub enable_webcam: bool,

    /// Webcam width as a percentage of the frame width
    #[serde(default = "default_webcam_size_percent", alias = "auth_size_percent")]
    pub webcam_size_percent: u32,

    /// Webcam overlay corner
    #[serde(default, alias = "auth_position")]
    pub webcam_position: WebcamPosition,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            voice_preset: VoiceSelection::default(),
            speed: default_speed(),
            subtitle_preset: default_subtitle_preset(),
            subtitle_position: default_subtitle_position(),
            subtitle_offset: 0.0,
            randomize_captions: true,
            blur_radius: default_blur_radius(),
            transition_preset: TransitionPreset::default(),
            random_transitions: true,
            image_quality: ImageQuality::default(),
            enable_intro: true,
            enable_outro: true,
            enable_webcam: true,
            webcam_size_percent: default_webcam_size_percent(),
            webcam_position: WebcamPosition::default(),
        }
    }
}

impl UnitConfig {
    /// Load `config.json` from a unit folder, falling back to `defaults` when absent
    pub fn load(unit_dir: &Path, defaults: &UnitConfig) -> Result<Self> {
        let path = unit_dir.join(UNIT_CONFIG_FILE);
        if !path.exists() {
            return Ok(defaults.clone());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read unit config: {:?}", path))?;
        let config: UnitConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse unit config: {:?}", path))?;
        config.validate().with_context(|| format!("Invalid unit config: {:?}", path))?;
        Ok(config)
    }

    /// Write this configuration into a unit folder
    pub fn save(&self, unit_dir: &Path) -> Result<()> {
        let path = unit_dir.join(UNIT_CONFIG_FILE);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize unit config")?;
        fs::write(&path, json).with_context(|| format!("Failed to write unit config: {:?}", path))?;
        Ok(())
    }

    /// Speech rate parameter, e.g. `-5%` for 0.95
    pub fn rate_string(&self) -> String {
        let percent = ((self.speed - 1.0) * 100.0).round() as i64;
        if percent >= 0 { format!("+{}%", percent) } else { format!("{}%", percent) }
    }

    /// Validate ranges and voice/language consistency
    pub fn validate(&self) -> Result<()> {
        if !(0.5..=2.0).contains(&self.speed) {
            return Err(anyhow!("Speech rate multiplier must be between 0.5 and 2.0, got {}", self.speed));
        }
        if !self.subtitle_offset.is_finite() || self.subtitle_offset.abs() > 10.0 {
            return Err(anyhow!("Caption offset must be within ±10 seconds, got {}", self.subtitle_offset));
        }
        if self.blur_radius > 100 {
            return Err(anyhow!("Blur radius must be at most 100, got {}", self.blur_radius));
        }
        if !(1..=50).contains(&self.webcam_size_percent) {
            return Err(anyhow!("Webcam size must be between 1 and 50 percent, got {}", self.webcam_size_percent));
        }
        for language in Language::ALL {
            let preset = self.voice_preset.for_language(language);
            if preset.language() != language {
                return Err(anyhow!("Voice preset {:?} does not speak {}", preset, language.name()));
            }
        }
        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_fps() -> u32 {
    25
}

fn default_min_slide_secs() -> u32 {
    4
}

fn default_max_slide_secs() -> u32 {
    8
}

fn default_min_slides() -> usize {
    8
}

fn default_max_workers() -> usize {
    23
}

fn default_max_chunk_chars() -> usize {
    4500
}

fn default_max_attempts() -> u32 {
    7
}

fn default_base_delay_ms() -> u64 {
    1500 // doubled on each retry
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_synthesis_timeout_secs() -> u64 {
    60
}

fn default_min_audio_bytes() -> u64 {
    2000
}

fn default_stabilization_pause_ms() -> u64 {
    500
}

fn default_edge_tts_path() -> String {
    "edge-tts".to_string()
}

fn default_whisper_model() -> String {
    "base".to_string()
}

fn default_whisper_path() -> String {
    "whisper".to_string()
}

fn default_transcription_timeout_secs() -> u64 {
    600
}

fn default_words_per_cue() -> usize {
    4
}

fn default_min_cue_duration() -> f64 {
    0.1
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_encode_timeout_secs() -> u64 {
    180
}

fn default_long_timeout_secs() -> u64 {
    300
}

fn default_webcam_fps() -> u32 {
    20
}

fn default_english_voice() -> VoicePreset {
    VoicePreset::AriaStandard
}

fn default_spanish_voice() -> VoicePreset {
    VoicePreset::ElviraElegant
}

fn default_speed() -> f64 {
    0.95
}

fn default_subtitle_preset() -> Option<CaptionPresetKey> {
    Some(CaptionPresetKey::PoppinsExtraBold)
}

fn default_subtitle_position() -> Option<CaptionPosition> {
    Some(CaptionPosition::Bottom)
}

fn default_blur_radius() -> u32 {
    30
}

fn default_webcam_size_percent() -> u32 {
    15
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the configuration file, writing defaults when it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path));
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let render = &self.render;
        if render.width == 0 || render.height == 0 || render.width % 2 != 0 || render.height % 2 != 0 {
            return Err(anyhow!("Frame size must be positive and even, got {}x{}", render.width, render.height));
        }
        if render.fps == 0 || render.fps > 120 {
            return Err(anyhow!("Frame rate must be between 1 and 120, got {}", render.fps));
        }
        if render.min_slide_secs == 0 || render.min_slide_secs > render.max_slide_secs {
            return Err(anyhow!(
                "Slide duration bounds are inconsistent: {}s..{}s",
                render.min_slide_secs,
                render.max_slide_secs
            ));
        }
        if render.min_slides == 0 {
            return Err(anyhow!("At least one slide is required"));
        }
        if !(0.0..=1.0).contains(&render.motion.max_zoom) || render.motion.max_pixel_pan < 0.0 {
            return Err(anyhow!("Motion limits out of range: {:?}", render.motion));
        }

        let synthesis = &self.synthesis;
        if synthesis.max_chunk_chars == 0 {
            return Err(anyhow!("Chunk size must be positive"));
        }
        if synthesis.max_attempts == 0 {
            return Err(anyhow!("At least one synthesis attempt is required"));
        }
        if synthesis.base_delay_ms > synthesis.max_delay_ms {
            return Err(anyhow!("Base retry delay exceeds the maximum delay"));
        }
        if synthesis.timeout_secs == 0 {
            return Err(anyhow!("Synthesis timeout must be positive"));
        }

        let transcription = &self.transcription;
        if transcription.words_per_cue == 0 {
            return Err(anyhow!("Captions need at least one word per cue"));
        }
        if transcription.min_cue_duration.is_nan() || transcription.min_cue_duration <= 0.0 {
            return Err(anyhow!("Minimum cue duration must be positive"));
        }
        if transcription.model.trim().is_empty() {
            return Err(anyhow!("Transcription model name is required"));
        }

        if self.encode.timeout_secs == 0 || self.encode.long_timeout_secs == 0 {
            return Err(anyhow!("Encode timeouts must be positive"));
        }

        self.unit_defaults.validate().context("Invalid unit defaults")
    }
}
