use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::errors::{MediaError, PipelineError};
use crate::media::MediaOps;
use crate::speech::AudioSegment;

/// Joins per-chunk audio into the narration track
#[derive(Debug, Clone)]
pub struct AudioAssembler {
    media: MediaOps,
    min_audio_bytes: u64,
}

impl AudioAssembler {
    pub fn new(media: MediaOps, min_audio_bytes: u64) -> Self {
        Self { media, min_audio_bytes }
    }

    /// Segments that passed validation and still exist on disk, in chunk order
    pub fn valid_segments(&self, segments: &[AudioSegment]) -> Vec<PathBuf> {
        let mut valid: Vec<&AudioSegment> = segments
            .iter()
            .filter(|s| {
                s.valid && std::fs::metadata(&s.path).map(|m| m.len() > self.min_audio_bytes).unwrap_or(false)
            })
            .collect();
        valid.sort_by_key(|s| s.ordinal);
        valid.into_iter().map(|s| s.path.clone()).collect()
    }

    /// Write the narration to `output`; chunk files are removed afterwards
    pub async fn assemble(&self, segments: &[AudioSegment], output: &Path) -> Result<u64, PipelineError> {
        let valid = self.valid_segments(segments);
        if valid.len() < segments.len() {
            warn!("Skipping {} invalid audio segment(s)", segments.len() - valid.len());
        }

        let result = match valid.len() {
            0 => Err(PipelineError::ResourceMissing("no valid audio segments to assemble".to_string())),
            1 => {
                info!("Single audio segment, copying");
                tokio::fs::copy(&valid[0], output).await.map_err(PipelineError::from)
            }
            n => {
                info!("Merging {} audio segments in order", n);
                self.media.concat_audio(&valid, output).await.map_err(PipelineError::from)
            }
        };

        for segment in segments {
            let _ = tokio::fs::remove_file(&segment.path).await;
        }

        let size = result?;
        if size == 0 {
            return Err(MediaError::InvalidOutput(output.to_path_buf()).into());
        }
        Ok(size)
    }
}
