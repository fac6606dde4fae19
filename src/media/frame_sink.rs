use async_trait::async_trait;
use image::RgbImage;
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

use crate::errors::MediaError;
use crate::media::filter_ffmpeg_stderr;

/// Destination for rendered frames
///
/// Frames must all have the size the sink was opened with and arrive in
/// presentation order.
#[async_trait]
pub trait FrameSink: Send {
    /// Append one frame
    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), MediaError>;

    /// Close the stream and wait for the encoder; returns the frame count
    async fn finish(self: Box<Self>) -> Result<u64, MediaError>;
}

/// Pipes raw rgb24 frames into an ffmpeg process encoding H.264
pub struct FfmpegFrameSink {
    tool: String,
    output: PathBuf,
    width: u32,
    height: u32,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: JoinHandle<Vec<u8>>,
    frames: u64,
    timeout: Duration,
}

impl FfmpegFrameSink {
    /// Start the encoder process
    pub fn spawn(
        ffmpeg: &str,
        output: &Path,
        width: u32,
        height: u32,
        fps: u32,
        timeout: Duration,
    ) -> Result<Self, MediaError> {
        let args = [
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-s".to_string(),
            format!("{}x{}", width, height),
            "-r".to_string(),
            fps.to_string(),
            "-i".to_string(),
            "-".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-crf".to_string(),
            "23".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];
        debug!("Opening frame encoder: {} {}", ffmpeg, args.join(" "));

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::Spawn { tool: ffmpeg.to_string(), message: e.to_string() })?;

        let stdin = child.stdin.take();
        let mut stderr = child.stderr.take();
        // Drain stderr concurrently so a chatty encoder never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            if let Some(stderr) = stderr.as_mut() {
                let _ = stderr.read_to_end(&mut buffer).await;
            }
            buffer
        });

        Ok(Self {
            tool: ffmpeg.to_string(),
            output: output.to_path_buf(),
            width,
            height,
            child,
            stdin,
            stderr_task,
            frames: 0,
            timeout,
        })
    }
}

#[async_trait]
impl FrameSink for FfmpegFrameSink {
    async fn write_frame(&mut self, frame: &RgbImage) -> Result<(), MediaError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(MediaError::FramePipe(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::FramePipe("encoder input already closed".to_string()))?;
        stdin
            .write_all(frame.as_raw())
            .await
            .map_err(|e| MediaError::FramePipe(format!("failed to write frame {}: {}", self.frames, e)))?;
        self.frames += 1;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<u64, MediaError> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().await.map_err(|e| MediaError::FramePipe(e.to_string()))?;
        }

        let status = tokio::select! {
            status = self.child.wait() => {
                status.map_err(|e| MediaError::Spawn { tool: self.tool.clone(), message: e.to_string() })?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(MediaError::Timeout { tool: self.tool.clone(), timeout: self.timeout });
            }
        };

        let stderr = self.stderr_task.await.unwrap_or_default();
        if !status.success() {
            let stderr = filter_ffmpeg_stderr(&String::from_utf8_lossy(&stderr));
            error!("Frame encoder failed for {:?}: {}", self.output, stderr);
            return Err(MediaError::ToolFailed { tool: self.tool.clone(), status: status.code().unwrap_or(-1), stderr });
        }

        debug!("Encoded {} frames into {:?}", self.frames, self.output);
        Ok(self.frames)
    }
}
