use log::debug;
use std::fmt;
use std::sync::Arc;

/// Pipeline stages of one video unit, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Synthesis,
    AudioAssembly,
    Slideshow,
    Merge,
    Transcription,
    Styling,
    CaptionOverlay,
    FinalAssembly,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 8] = [
        PipelineStage::Synthesis,
        PipelineStage::AudioAssembly,
        PipelineStage::Slideshow,
        PipelineStage::Merge,
        PipelineStage::Transcription,
        PipelineStage::Styling,
        PipelineStage::CaptionOverlay,
        PipelineStage::FinalAssembly,
    ];

    /// Position of the stage in the pipeline
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::Synthesis => "Synthesizing speech",
            PipelineStage::AudioAssembly => "Assembling audio",
            PipelineStage::Slideshow => "Rendering slideshow",
            PipelineStage::Merge => "Merging audio and video",
            PipelineStage::Transcription => "Transcribing narration",
            PipelineStage::Styling => "Styling captions",
            PipelineStage::CaptionOverlay => "Burning captions",
            PipelineStage::FinalAssembly => "Final assembly",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One progress notification
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub unit: String,
    pub stage: PipelineStage,
    /// Overall unit progress in `[0, 1]`
    pub fraction: f64,
    pub message: String,
}

/// Receives progress updates
pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Stage-level progress of one unit.
///
/// Overall progress is `completed / total + current / total`, where
/// `current` is the fraction of the running stage.
#[derive(Clone)]
pub struct ProgressTracker {
    unit: String,
    total: usize,
    completed: usize,
    current: f64,
    stage: PipelineStage,
    callback: Option<ProgressCallback>,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("unit", &self.unit)
            .field("completed", &self.completed)
            .field("current", &self.current)
            .field("stage", &self.stage)
            .finish()
    }
}

impl ProgressTracker {
    pub fn new(unit: impl Into<String>, callback: Option<ProgressCallback>) -> Self {
        Self {
            unit: unit.into(),
            total: PipelineStage::ALL.len(),
            completed: 0,
            current: 0.0,
            stage: PipelineStage::Synthesis,
            callback,
        }
    }

    /// Overall fraction of the unit that is done
    pub fn fraction(&self) -> f64 {
        ((self.completed as f64 + self.current) / self.total as f64).clamp(0.0, 1.0)
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Enter a stage; earlier stages count as complete
    pub fn start(&mut self, stage: PipelineStage) {
        self.stage = stage;
        self.completed = stage.index();
        self.current = 0.0;
        debug!("{}: {}", self.unit, stage);
        self.emit(stage.label().to_string());
    }

    /// Report progress inside the running stage
    pub fn update(&mut self, stage_fraction: f64, message: impl Into<String>) {
        self.current = stage_fraction.clamp(0.0, 1.0);
        self.emit(message.into());
    }

    /// Mark the running stage as done
    pub fn finish_stage(&mut self) {
        self.completed = (self.stage.index() + 1).min(self.total);
        self.current = 0.0;
        self.emit(format!("{} done", self.stage.label()));
    }

    /// Callback mapping (done, total) counts onto `[from, to]` of the running stage
    pub fn counter(&self, from: f64, to: f64) -> impl Fn(usize, usize) + Clone + Send + Sync + 'static {
        let tracker = self.clone();
        move |done: usize, total: usize| {
            let mut local = tracker.clone();
            let fraction = from + (to - from) * done as f64 / total.max(1) as f64;
            local.update(fraction, format!("{}/{}", done, total));
        }
    }

    fn emit(&self, message: String) {
        if let Some(callback) = &self.callback {
            callback(&ProgressUpdate {
                unit: self.unit.clone(),
                stage: self.stage,
                fraction: self.fraction(),
                message,
            });
        }
    }
}
