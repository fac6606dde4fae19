/*!
 * External encode tool plumbing.
 *
 * Every container operation (mux, concat, scale, pad, overlay, caption
 * burn-in) is delegated to ffmpeg through the `EncodeTool` trait. The trait
 * keeps the pipeline testable: tests plug in a tool that fabricates outputs
 * instead of spawning processes.
 */

use async_trait::async_trait;
use log::{debug, error};
use std::fmt::Debug;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::EncodeConfig;
use crate::errors::MediaError;

pub mod frame_sink;
pub mod operations;

pub use frame_sink::{FfmpegFrameSink, FrameSink};
pub use operations::{ClipInfo, ConcatStrategy, MediaOps, Orientation};

/// Timeout for probe calls
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Run an external program, killing it when `timeout` elapses
pub async fn run_command(program: &str, args: &[String], timeout: Duration) -> Result<Output, MediaError> {
    debug!("Running {} {}", program, args.join(" "));

    let future = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::select! {
        result = future => {
            result.map_err(|e| MediaError::Spawn { tool: program.to_string(), message: e.to_string() })?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(MediaError::Timeout { tool: program.to_string(), timeout });
        }
    };

    Ok(output)
}

/// Turn a finished process into a `ToolFailed` error when it exited non-zero
pub fn check_status(tool: &str, output: &Output) -> Result<(), MediaError> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = filter_ffmpeg_stderr(&String::from_utf8_lossy(&output.stderr));
    error!("{} failed: {}", tool, stderr);
    Err(MediaError::ToolFailed { tool: tool.to_string(), status: output.status.code().unwrap_or(-1), stderr })
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "libav",
        "libsw",
        "libpostproc",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "encoder",
        "handler_name",
        "major_brand",
        "minor_version",
        "compatible_brands",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "frame=",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return false;
            }
            !noise_prefixes.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// The media encode collaborator
///
/// `run` receives a full ffmpeg argument list whose last element is the
/// output path; success means a zero exit status. Output validation is done
/// by the caller.
#[async_trait]
pub trait EncodeTool: Send + Sync + Debug {
    /// Run one encode operation
    async fn run(&self, args: &[String], timeout: Duration) -> Result<(), MediaError>;

    /// Run a probe and return its stdout
    async fn probe(&self, args: &[String]) -> Result<String, MediaError>;

    /// Open an encoder that accepts raw RGB frames
    async fn open_frame_sink(
        &self,
        output: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn FrameSink>, MediaError>;
}

/// `EncodeTool` backed by the ffmpeg and ffprobe executables
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: String,
    ffprobe: String,
    sink_timeout: Duration,
}

impl FfmpegTool {
    /// Create a tool from the encode settings
    pub fn new(config: &EncodeConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            sink_timeout: config.long_timeout(),
        }
    }

    /// Check that ffmpeg can be launched
    pub async fn check_available(&self) -> Result<(), MediaError> {
        let output = run_command(&self.ffmpeg, &["-version".to_string()], PROBE_TIMEOUT).await?;
        check_status(&self.ffmpeg, &output)
    }
}

#[async_trait]
impl EncodeTool for FfmpegTool {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<(), MediaError> {
        let mut full_args = vec!["-hide_banner".to_string(), "-nostdin".to_string()];
        full_args.extend_from_slice(args);
        let output = run_command(&self.ffmpeg, &full_args, timeout).await?;
        check_status(&self.ffmpeg, &output)
    }

    async fn probe(&self, args: &[String]) -> Result<String, MediaError> {
        let output = run_command(&self.ffprobe, args, PROBE_TIMEOUT).await?;
        check_status(&self.ffprobe, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn open_frame_sink(
        &self,
        output: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn FrameSink>, MediaError> {
        let sink = FfmpegFrameSink::spawn(&self.ffmpeg, output, width, height, fps, self.sink_timeout)?;
        Ok(Box::new(sink))
    }
}
