//! External transcoding tool
//!
//! The converter treats ffmpeg as a black box: given a source path it either
//! produces the output file or fails.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::PipelineError;

/// Extension of extracted audio files
pub const AUDIO_EXTENSION: &str = "mp3";

/// Output path for a source file: same directory and stem, audio extension
pub fn audio_path_for(source: &Path) -> PathBuf {
    source.with_extension(AUDIO_EXTENSION)
}

/// Extracts the audio track of a media file
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Write the audio of `source` to `output`
    async fn extract_audio(&self, source: &Path, output: &Path) -> Result<(), PipelineError>;

    /// Name for logging
    fn name(&self) -> &'static str;
}

/// Transcoder backed by the ffmpeg binary
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegTranscoder {
    /// Create a transcoder with an explicit binary path or name
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout: None,
        }
    }

    /// Kill ffmpeg if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments selecting the best audio stream at top quality
    pub fn arguments(source: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-q:a".into(),
            "0".into(),
            "-map".into(),
            "a".into(),
            output.as_os_str().to_owned(),
        ]
    }

    async fn run(&self, source: &Path, output: &Path) -> Result<std::process::Output, PipelineError> {
        let child = Command::new(&self.binary_path)
            .args(Self::arguments(source, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PipelineError::Convert(format!(
                    "failed to launch {}: {e}",
                    self.binary_path.display()
                ))
            })?;

        let output_future = child.wait_with_output();

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, output_future)
                .await
                .map_err(|_| PipelineError::Timeout {
                    step: "convert",
                    after: limit,
                })?,
            None => output_future.await,
        };

        result.map_err(|e| PipelineError::Convert(format!("failed to wait for ffmpeg: {e}")))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_audio(&self, source: &Path, output: &Path) -> Result<(), PipelineError> {
        let result = self.run(source, output).await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(PipelineError::Convert(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                last_line.trim()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
