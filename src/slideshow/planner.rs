use log::info;
use rand::Rng;
use std::path::PathBuf;

use crate::app_config::RenderConfig;
use crate::errors::PipelineError;
use crate::motion::MotionEffect;

/// One slide of the plan
#[derive(Debug, Clone, PartialEq)]
pub struct SlideEntry {
    pub image: PathBuf,
    pub effect: MotionEffect,
    pub frame_count: usize,
}

/// Ordered slides for one unit
#[derive(Debug, Clone, PartialEq)]
pub struct SlidePlan {
    pub entries: Vec<SlideEntry>,
    /// Nominal frames per slide before exact distribution
    pub frames_per_slide: usize,
    pub slides_needed: usize,
    /// Target frame count; the entries' frame counts sum to it
    pub total_frames: usize,
}

impl SlidePlan {
    /// Sum of planned frames
    pub fn planned_frames(&self) -> usize {
        self.entries.iter().map(|e| e.frame_count).sum()
    }

    /// Distinct images referenced by the plan, in first-use order
    pub fn unique_images(&self) -> Vec<PathBuf> {
        let mut seen = std::collections::HashSet::new();
        self.entries.iter().filter(|e| seen.insert(e.image.clone())).map(|e| e.image.clone()).collect()
    }

    /// Drop slides whose image could not be prepared and redistribute their frames
    pub fn retain_images(&mut self, keep: impl Fn(&PathBuf) -> bool) {
        self.entries.retain(|e| keep(&e.image));
        let counts = distribute_frames(self.total_frames, self.entries.len());
        for (entry, count) in self.entries.iter_mut().zip(counts) {
            entry.frame_count = count;
        }
    }
}

/// Split `total` frames over `slides` slides, remainder to the earliest ones
pub fn distribute_frames(total: usize, slides: usize) -> Vec<usize> {
    if slides == 0 {
        return Vec::new();
    }
    let base = total / slides;
    let remainder = total % slides;
    (0..slides).map(|i| base + usize::from(i < remainder)).collect()
}

/// Decides how many slides a unit needs and which images fill them
#[derive(Debug, Clone, Copy)]
pub struct SlidePlanner {
    fps: u32,
    min_slide_secs: u32,
    max_slide_secs: u32,
    min_slides: usize,
}

impl SlidePlanner {
    pub fn new(render: &RenderConfig) -> Self {
        Self {
            fps: render.fps,
            min_slide_secs: render.min_slide_secs,
            max_slide_secs: render.max_slide_secs,
            min_slides: render.min_slides,
        }
    }

    /// Whole frames that fit in `duration_secs`; a trailing partial frame is dropped
    pub fn total_frames(&self, duration_secs: f64) -> usize {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return 0;
        }
        (duration_secs * self.fps as f64).floor() as usize
    }

    pub fn frames_per_slide(&self, total_frames: usize, image_count: usize) -> usize {
        let min = (self.min_slide_secs * self.fps) as usize;
        let max = (self.max_slide_secs * self.fps) as usize;
        (total_frames / image_count.max(self.min_slides)).clamp(min, max)
    }

    pub fn slides_needed(&self, total_frames: usize, frames_per_slide: usize) -> usize {
        (total_frames / frames_per_slide.max(1)).max(self.min_slides)
    }

    /// Pick `slides_needed` images: the first ones when there are enough,
    /// otherwise every original once plus uniform draws with replacement.
    pub fn select_images<R: Rng + ?Sized>(&self, images: &[PathBuf], slides_needed: usize, rng: &mut R) -> Vec<PathBuf> {
        if images.is_empty() {
            return Vec::new();
        }
        if images.len() >= slides_needed {
            info!("Using {} of {} images without duplication", slides_needed, images.len());
            return images[..slides_needed].to_vec();
        }

        let extra = slides_needed - images.len();
        info!("Adding {} repeated slides to {} originals", extra, images.len());
        let mut selected = images.to_vec();
        selected.extend((0..extra).map(|_| images[rng.random_range(0..images.len())].clone()));
        selected
    }

    /// Build the plan for a narration of `duration_secs`
    pub fn plan<R: Rng + ?Sized>(&self, images: &[PathBuf], duration_secs: f64, rng: &mut R) -> Result<SlidePlan, PipelineError> {
        if images.is_empty() {
            return Err(PipelineError::ResourceMissing("no images to plan slides from".to_string()));
        }
        let total_frames = self.total_frames(duration_secs);
        if total_frames == 0 {
            return Err(PipelineError::Render(format!("invalid target duration: {}", duration_secs)));
        }

        let frames_per_slide = self.frames_per_slide(total_frames, images.len());
        let slides_needed = self.slides_needed(total_frames, frames_per_slide);
        info!(
            "Slide plan: {} frames, {} frames per slide, {} slides from {} images",
            total_frames,
            frames_per_slide,
            slides_needed,
            images.len()
        );

        let selected = self.select_images(images, slides_needed, rng);
        let counts = distribute_frames(total_frames, selected.len());
        let entries = selected
            .into_iter()
            .zip(counts)
            .map(|(image, frame_count)| {
                let effect = MotionEffect::ALL[rng.random_range(0..MotionEffect::ALL.len())];
                SlideEntry { image, effect, frame_count }
            })
            .collect();

        Ok(SlidePlan { entries, frames_per_slide, slides_needed, total_frames })
    }
}
