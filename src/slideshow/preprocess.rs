use futures::stream::{self, StreamExt};
use image::RgbImage;
use image::imageops::{self, FilterType};
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::app_config::ImageQuality;
use crate::errors::PipelineError;

/// Gaussian sigma for a square kernel of `2r+1`, matching the usual
/// derivation when only the kernel size is given
pub fn blur_sigma(radius: u32) -> f32 {
    let kernel = (radius * 2 + 1) as f32;
    0.3 * ((kernel - 1.0) * 0.5 - 1.0) + 0.8
}

/// Downscale by the quality factor, blur, then resize to the output frame
pub fn preprocess_image(path: &Path, width: u32, height: u32, blur_radius: u32, quality: ImageQuality) -> Result<RgbImage, PipelineError> {
    let source = image::open(path)
        .map_err(|e| PipelineError::Render(format!("failed to read image {:?}: {}", path, e)))?
        .to_rgb8();

    let factor = quality.reduction_factor();
    let reduced_width = ((source.width() as f32 * factor) as u32).max(1);
    let reduced_height = ((source.height() as f32 * factor) as u32).max(1);
    let mut working = imageops::resize(&source, reduced_width, reduced_height, FilterType::Triangle);

    if blur_radius > 0 {
        working = imageops::blur(&working, blur_sigma(blur_radius));
    }

    Ok(imageops::resize(&working, width, height, FilterType::Triangle))
}

/// Prepared base images, keyed by source path
#[derive(Debug, Default)]
pub struct PreparedImages {
    pub images: HashMap<PathBuf, Arc<RgbImage>>,
    /// Images that could not be read or processed
    pub failed: Vec<PathBuf>,
}

/// Parallel image preprocessing on a bounded worker pool
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    width: u32,
    height: u32,
    blur_radius: u32,
    quality: ImageQuality,
    workers: usize,
}

impl ImagePreprocessor {
    pub fn new(width: u32, height: u32, blur_radius: u32, quality: ImageQuality, workers: usize) -> Self {
        Self { width, height, blur_radius, quality, workers: workers.max(1) }
    }

    /// Prepare each distinct path once; `progress` receives (done, total)
    pub async fn prepare(&self, paths: &[PathBuf], progress: impl Fn(usize, usize) + Clone + Send + 'static) -> PreparedImages {
        let mut unique: Vec<PathBuf> = Vec::with_capacity(paths.len());
        for path in paths {
            if !unique.contains(path) {
                unique.push(path.clone());
            }
        }

        let total = unique.len();
        let done = Arc::new(AtomicUsize::new(0));
        info!("Preprocessing {} images on {} workers (blur {})", total, self.workers, self.blur_radius);

        let results = stream::iter(unique.into_iter())
            .map(|path| {
                let done = done.clone();
                let progress = progress.clone();
                let (width, height, blur_radius, quality) = (self.width, self.height, self.blur_radius, self.quality);

                async move {
                    let task_path = path.clone();
                    let result = tokio::task::spawn_blocking(move || {
                        preprocess_image(&task_path, width, height, blur_radius, quality)
                    })
                    .await
                    .unwrap_or_else(|e| Err(PipelineError::Render(format!("image worker failed: {}", e))));

                    let current = done.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(current, total);
                    (path, result)
                }
            })
            .buffer_unordered(self.workers)
            .collect::<Vec<_>>()
            .await;

        let mut prepared = PreparedImages::default();
        for (path, result) in results {
            match result {
                Ok(image) => {
                    prepared.images.insert(path, Arc::new(image));
                }
                Err(e) => {
                    warn!("Skipping image: {}", e);
                    prepared.failed.push(path);
                }
            }
        }
        prepared.failed.sort();

        info!("Prepared {}/{} images", prepared.images.len(), total);
        prepared
    }
}
