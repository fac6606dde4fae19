use log::{debug, info};
use std::sync::Arc;

use crate::errors::PipelineError;
use crate::media::FrameSink;
use crate::motion::{MotionEngine, MotionParameters, warp_frame};
use crate::slideshow::{PreparedImages, SlideEntry, SlidePlan};

/// Progress within a slide for frame `index` of `frame_count`
pub fn slide_progress(index: usize, frame_count: usize) -> f64 {
    index as f64 / frame_count.saturating_sub(1).max(1) as f64
}

/// Animates planned slides into a frame stream
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRenderer {
    engine: MotionEngine,
}

impl FrameRenderer {
    pub fn new(engine: MotionEngine) -> Self {
        Self { engine }
    }

    /// Transforms for every frame of one slide, in order
    pub fn slide_parameters(&self, entry: &SlideEntry) -> Vec<MotionParameters> {
        (0..entry.frame_count)
            .map(|i| self.engine.parameters(entry.effect, slide_progress(i, entry.frame_count)))
            .collect()
    }

    /// Render every slide in plan order into `sink`; returns the frame count.
    ///
    /// `progress` receives (frames written, total frames).
    pub async fn render(
        &self,
        plan: &SlidePlan,
        images: &PreparedImages,
        mut sink: Box<dyn FrameSink>,
        progress: impl Fn(usize, usize),
    ) -> Result<u64, PipelineError> {
        let total = plan.planned_frames();
        let mut written = 0usize;
        info!("Rendering {} slides ({} frames)", plan.entries.len(), total);

        for (slide, entry) in plan.entries.iter().enumerate() {
            let base = images
                .images
                .get(&entry.image)
                .cloned()
                .ok_or_else(|| PipelineError::Render(format!("no prepared image for {:?}", entry.image)))?;
            debug!("Slide {}: {} for {} frames", slide + 1, entry.effect, entry.frame_count);

            for params in self.slide_parameters(entry) {
                let source = Arc::clone(&base);
                let frame = tokio::task::spawn_blocking(move || warp_frame(&source, &params))
                    .await
                    .map_err(|e| PipelineError::Render(format!("frame worker failed: {}", e)))?;
                sink.write_frame(&frame).await?;
                written += 1;
                progress(written, total);
            }
        }

        let frames = sink.finish().await?;
        info!("Rendered {} frames", frames);
        Ok(frames)
    }
}
