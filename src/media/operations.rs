/*!
 * Container-level operations built on the encode tool.
 *
 * Every operation builds an explicit ffmpeg argument list, runs it under
 * the configured timeout and then checks that the output file exists and is
 * non-empty. Scratch files live in a temporary directory next to the output
 * and disappear when the operation returns.
 */

use log::{debug, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{EncodeConfig, WebcamPosition};
use crate::errors::MediaError;
use crate::media::EncodeTool;

/// Orientation of a probed clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
}

/// Basic facts about a video clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

impl ClipInfo {
    pub fn orientation(&self) -> Orientation {
        match self.width.cmp(&self.height) {
            std::cmp::Ordering::Greater => Orientation::Landscape,
            std::cmp::Ordering::Less => Orientation::Portrait,
            std::cmp::Ordering::Equal => Orientation::Square,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeStreams {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// How the final concatenation succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStrategy {
    /// Only one component, copied as-is
    Single,
    /// Every component normalized to the output frame and re-encoded
    Normalized,
    /// Normalized concat failed; components were stream-copied
    StreamCopyFallback,
}

/// Media operations against one output frame size
#[derive(Debug, Clone)]
pub struct MediaOps {
    tool: Arc<dyn EncodeTool>,
    config: EncodeConfig,
    width: u32,
    height: u32,
    fps: u32,
}

fn arg(value: impl Into<String>) -> String {
    value.into()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Quote a path for an ffmpeg concat list
fn concat_list_entry(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/").replace('\'', "'\\''");
    format!("file '{}'\n", normalized)
}

/// Escape a path for use inside a filter graph argument
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\").replace(':', "\\:").replace('\'', "\\'")
}

/// Check that an operation produced a non-empty file
pub fn verify_output(path: &Path) -> Result<u64, MediaError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.len() > 0 => Ok(metadata.len()),
        _ => Err(MediaError::InvalidOutput(path.to_path_buf())),
    }
}

fn scratch_dir(output: &Path) -> Result<tempfile::TempDir, MediaError> {
    let parent = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    Ok(tempfile::Builder::new().prefix(".slidecast-").tempdir_in(parent)?)
}

impl MediaOps {
    /// Create operations for a `width`x`height` output at `fps`
    pub fn new(tool: Arc<dyn EncodeTool>, config: EncodeConfig, width: u32, height: u32, fps: u32) -> Self {
        Self { tool, config, width, height, fps }
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    async fn run_checked(&self, args: Vec<String>, output: &Path, timeout: Duration) -> Result<u64, MediaError> {
        self.tool.run(&args, timeout).await?;
        verify_output(output)
    }

    async fn concat_list(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        codec_args: &[&str],
        timeout: Duration,
    ) -> Result<u64, MediaError> {
        let scratch = scratch_dir(output)?;
        let list = scratch.path().join("concat_list.txt");
        let content: String = inputs.iter().map(|p| concat_list_entry(p)).collect();
        fs::write(&list, content)?;

        let mut args = vec![arg("-f"), arg("concat"), arg("-safe"), arg("0"), arg("-i"), path_arg(&list)];
        args.extend(codec_args.iter().map(|a| a.to_string()));
        args.push(arg("-y"));
        args.push(path_arg(output));
        self.run_checked(args, output, timeout).await
    }

    /// Join audio files in order without re-encoding
    pub async fn concat_audio(&self, inputs: &[PathBuf], output: &Path) -> Result<u64, MediaError> {
        info!("Concatenating {} audio segments", inputs.len());
        self.concat_list(inputs, output, &["-c", "copy"], self.timeout()).await
    }

    /// Mux the silent slideshow with the narration, cut to the shorter stream
    pub async fn merge_audio_video(&self, video: &Path, audio: &Path, output: &Path) -> Result<u64, MediaError> {
        info!("Merging slideshow and narration");
        let args = vec![
            arg("-i"),
            path_arg(video),
            arg("-i"),
            path_arg(audio),
            arg("-c:v"),
            arg("libx264"),
            arg("-preset"),
            arg("fast"),
            arg("-crf"),
            arg("23"),
            arg("-c:a"),
            arg("aac"),
            arg("-b:a"),
            arg("128k"),
            arg("-ar"),
            arg("44100"),
            arg("-ac"),
            arg("2"),
            arg("-map"),
            arg("0:v"),
            arg("-map"),
            arg("1:a"),
            arg("-avoid_negative_ts"),
            arg("make_zero"),
            arg("-shortest"),
            arg("-y"),
            path_arg(output),
        ];
        self.run_checked(args, output, self.config.long_timeout()).await
    }

    /// Extract mono 16 kHz PCM for the transcription engine
    pub async fn extract_audio_for_transcription(&self, video: &Path, output: &Path) -> Result<u64, MediaError> {
        let args = vec![
            arg("-i"),
            path_arg(video),
            arg("-vn"),
            arg("-acodec"),
            arg("pcm_s16le"),
            arg("-ar"),
            arg("16000"),
            arg("-ac"),
            arg("1"),
            arg("-y"),
            path_arg(output),
        ];
        self.run_checked(args, output, self.timeout()).await
    }

    /// Render a caption file onto the video, copying the audio stream
    pub async fn burn_captions(&self, video: &Path, captions: &Path, output: &Path) -> Result<u64, MediaError> {
        let escaped = escape_filter_path(captions);
        let is_ass = captions
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("ass"))
            .unwrap_or(false);
        let filter = if is_ass { format!("ass='{}'", escaped) } else { format!("subtitles='{}'", escaped) };
        info!("Burning captions from {:?}", captions.file_name().unwrap_or_default());

        let args = vec![
            arg("-i"),
            path_arg(video),
            arg("-vf"),
            filter,
            arg("-c:v"),
            arg("libx264"),
            arg("-preset"),
            arg("fast"),
            arg("-crf"),
            arg("23"),
            arg("-c:a"),
            arg("copy"),
            arg("-y"),
            path_arg(output),
        ];
        self.run_checked(args, output, self.config.long_timeout()).await
    }

    /// Container duration in seconds
    pub async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        let args = vec![
            arg("-i"),
            path_arg(path),
            arg("-show_entries"),
            arg("format=duration"),
            arg("-v"),
            arg("quiet"),
            arg("-of"),
            arg("csv=p=0"),
        ];
        let stdout = self.tool.probe(&args).await?;
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|_| MediaError::Probe(format!("unexpected duration output for {:?}: {:?}", path, stdout.trim())))
    }

    /// Size and duration of the first video stream
    pub async fn clip_info(&self, path: &Path) -> Result<ClipInfo, MediaError> {
        let args = vec![
            arg("-v"),
            arg("quiet"),
            arg("-print_format"),
            arg("json"),
            arg("-show_streams"),
            path_arg(path),
        ];
        let stdout = self.tool.probe(&args).await?;
        let parsed: ProbeStreams = serde_json::from_str(&stdout)
            .map_err(|e| MediaError::Probe(format!("invalid stream listing for {:?}: {}", path, e)))?;

        let stream = parsed
            .streams
            .into_iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| MediaError::Probe(format!("no video stream in {:?}", path)))?;

        Ok(ClipInfo {
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            duration: stream.duration.and_then(|d| d.parse().ok()).unwrap_or(0.0),
        })
    }

    /// Scale a bookend clip to the output frame, letterboxing portrait clips
    pub async fn normalize_clip(&self, input: &Path, output: &Path) -> Result<u64, MediaError> {
        let info = self.clip_info(input).await?;
        debug!("Clip {:?}: {}x{} ({:?})", input.file_name().unwrap_or_default(), info.width, info.height, info.orientation());

        let filter = match info.orientation() {
            Orientation::Portrait => {
                let inner_width = ((self.height * 9 / 16) + 1) & !1;
                info!("Letterboxing portrait clip {:?}", input.file_name().unwrap_or_default());
                format!(
                    "scale={iw}:{h},pad={w}:{h}:({w}-{iw})/2:0:black,fps={fps}",
                    iw = inner_width,
                    w = self.width,
                    h = self.height,
                    fps = self.fps
                )
            }
            _ => format!("scale={}:{},fps={}", self.width, self.height, self.fps),
        };

        let args = vec![
            arg("-i"),
            path_arg(input),
            arg("-vf"),
            filter,
            arg("-c:v"),
            arg("libx264"),
            arg("-preset"),
            arg("fast"),
            arg("-crf"),
            arg("23"),
            arg("-c:a"),
            arg("aac"),
            arg("-b:a"),
            arg("128k"),
            arg("-ar"),
            arg("44100"),
            arg("-ac"),
            arg("2"),
            arg("-avoid_negative_ts"),
            arg("make_zero"),
            arg("-fflags"),
            arg("+genpts"),
            arg("-y"),
            path_arg(output),
        ];
        self.run_checked(args, output, self.timeout()).await
    }

    /// Webcam box size for a width percentage, always 16:9
    pub fn webcam_size(&self, size_percent: u32) -> (u32, u32) {
        let width = (self.width * size_percent / 100) & !1;
        let height = (width * 9 / 16) & !1;
        (width, height)
    }

    /// Build a webcam track of `target_duration` seconds.
    ///
    /// A source shorter than the target is repeated, alternating normal and
    /// horizontally mirrored cycles, with the last cycle cut to fit.
    pub async fn build_webcam_track(
        &self,
        source: &Path,
        target_duration: f64,
        size_percent: u32,
        output: &Path,
    ) -> Result<u64, MediaError> {
        let source_duration = self.probe_duration(source).await?;
        if source_duration <= 0.0 {
            return Err(MediaError::Probe(format!("webcam clip {:?} has no duration", source)));
        }

        let (width, height) = self.webcam_size(size_percent);
        info!("Webcam size: {}x{}", width, height);

        let cycle_args = |duration: f64, flipped: bool, cycle_output: &Path| {
            let filter = if flipped {
                format!("hflip,scale={}:{}", width, height)
            } else {
                format!("scale={}:{}", width, height)
            };
            vec![
                arg("-i"),
                path_arg(source),
                arg("-t"),
                format!("{:.3}", duration),
                arg("-vf"),
                filter,
                arg("-r"),
                self.config.webcam_fps.to_string(),
                arg("-c:v"),
                arg("libx264"),
                arg("-preset"),
                arg("fast"),
                arg("-crf"),
                arg("28"),
                arg("-c:a"),
                arg("aac"),
                arg("-y"),
                path_arg(cycle_output),
            ]
        };

        if target_duration <= source_duration {
            return self.run_checked(cycle_args(target_duration, false, output), output, self.timeout()).await;
        }

        let cycles = (target_duration / source_duration).ceil() as usize;
        info!("Creating {} webcam cycles with flips", cycles);

        let scratch = scratch_dir(output)?;
        let mut cycle_files = Vec::with_capacity(cycles);
        for cycle in 0..cycles {
            let cycle_file = scratch.path().join(format!("webcam_cycle_{}.mp4", cycle));
            let duration = if cycle + 1 == cycles {
                source_duration.min(target_duration - cycle as f64 * source_duration)
            } else {
                source_duration
            };
            self.run_checked(cycle_args(duration, cycle % 2 == 1, &cycle_file), &cycle_file, self.timeout())
                .await?;
            cycle_files.push(cycle_file);
        }

        let trim = format!("{:.3}", target_duration);
        self.concat_list(&cycle_files, output, &["-t", &trim, "-c", "copy"], self.timeout()).await
    }

    /// Overlay the webcam track at a corner of the main video
    pub async fn overlay_webcam(
        &self,
        main: &Path,
        webcam: &Path,
        size_percent: u32,
        position: WebcamPosition,
        output: &Path,
    ) -> Result<u64, MediaError> {
        let (width, height) = self.webcam_size(size_percent);
        let (x, y) = position.origin((self.width, self.height), (width, height));
        info!("Overlaying webcam at {:?}", position);

        let args = vec![
            arg("-i"),
            path_arg(main),
            arg("-i"),
            path_arg(webcam),
            arg("-filter_complex"),
            format!("[1:v]scale={}:{}[webcam];[0:v][webcam]overlay={}:{}[out]", width, height, x, y),
            arg("-map"),
            arg("[out]"),
            arg("-map"),
            arg("0:a"),
            arg("-c:v"),
            arg("libx264"),
            arg("-preset"),
            arg("fast"),
            arg("-crf"),
            arg("23"),
            arg("-c:a"),
            arg("copy"),
            arg("-y"),
            path_arg(output),
        ];
        self.run_checked(args, output, self.config.long_timeout()).await
    }

    /// Concatenate clips in order into one output.
    ///
    /// Every clip is first normalized to the output frame; if that path fails
    /// anywhere, one plain stream-copy concat of the original clips is tried.
    pub async fn concat_clips(&self, inputs: &[PathBuf], output: &Path) -> Result<ConcatStrategy, MediaError> {
        if inputs.len() == 1 {
            fs::copy(&inputs[0], output)?;
            verify_output(output)?;
            return Ok(ConcatStrategy::Single);
        }

        match self.concat_normalized(inputs, output).await {
            Ok(_) => Ok(ConcatStrategy::Normalized),
            Err(e) => {
                warn!("Normalized concatenation failed ({}), trying simple concatenation", e);
                self.concat_list(inputs, output, &["-c", "copy"], self.timeout()).await?;
                info!("Fallback stream-copy concatenation succeeded");
                Ok(ConcatStrategy::StreamCopyFallback)
            }
        }
    }

    async fn concat_normalized(&self, inputs: &[PathBuf], output: &Path) -> Result<u64, MediaError> {
        let scratch = scratch_dir(output)?;
        let mut normalized = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            let target = scratch.path().join(format!("normalized_{}.mp4", i));
            self.normalize_clip(input, &target).await?;
            normalized.push(target);
        }

        self.concat_list(
            &normalized,
            output,
            &["-c:v", "libx264", "-preset", "fast", "-crf", "23", "-c:a", "aac", "-b:a", "128k", "-movflags", "+faststart"],
            self.config.long_timeout(),
        )
        .await
    }
}
