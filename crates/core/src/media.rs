use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{
    config::{CutMode, ToolPaths},
    error::MediaError,
};

/// Media-processing collaborator: splits, trims and probes video files.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Split `source` into stream-copied parts of `part_duration` seconds,
    /// named by the printf-style `output_pattern`.
    async fn split(
        &self,
        source: &Path,
        part_duration: f64,
        output_pattern: &Path,
    ) -> Result<(), MediaError>;

    /// Write `duration` seconds of `source`, starting at `start`, to `output`.
    async fn trim(
        &self,
        source: &Path,
        start: f64,
        duration: f64,
        output: &Path,
        mode: CutMode,
    ) -> Result<(), MediaError>;

    /// Container duration of `path` in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError>;
}

/// [`MediaEngine`] backed by the `ffmpeg` and `ffprobe` binaries.
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Ffmpeg {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }

    fn split_args(source: &Path, part_duration: f64, output_pattern: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            source.into(),
        ];
        for arg in [
            "-c",
            "copy",
            "-map",
            "0",
            "-f",
            "segment",
            "-segment_time",
        ] {
            args.push(arg.into());
        }
        args.push(format!("{part_duration}").into());
        args.push("-reset_timestamps".into());
        args.push("1".into());
        args.push(output_pattern.into());
        args
    }

    fn trim_args(
        source: &Path,
        start: f64,
        duration: f64,
        output: &Path,
        mode: CutMode,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-ss".into(),
            format!("{start:.3}").into(),
            "-i".into(),
            source.into(),
            "-t".into(),
            format!("{duration:.3}").into(),
        ];
        if mode == CutMode::StreamCopy {
            for arg in ["-c", "copy", "-avoid_negative_ts", "make_zero"] {
                args.push(arg.into());
            }
        }
        args.push(output.into());
        args
    }

    fn probe_args(path: &Path) -> Vec<OsString> {
        vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            path.into(),
        ]
    }

    async fn run(tool: &Path, args: Vec<OsString>) -> Result<Vec<u8>, MediaError> {
        let tool_name = tool.display().to_string();
        debug!(tool = %tool_name, ?args, "Running media tool");

        let output = Command::new(tool)
            .args(&args)
            .output()
            .await
            .map_err(|source| MediaError::Spawn {
                tool: tool_name.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::Failed {
                tool: tool_name,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Parse the single duration line `ffprobe` prints for `format=duration`.
pub fn parse_probe_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

#[async_trait]
impl MediaEngine for Ffmpeg {
    async fn split(
        &self,
        source: &Path,
        part_duration: f64,
        output_pattern: &Path,
    ) -> Result<(), MediaError> {
        Self::run(
            &self.ffmpeg,
            Self::split_args(source, part_duration, output_pattern),
        )
        .await?;
        Ok(())
    }

    async fn trim(
        &self,
        source: &Path,
        start: f64,
        duration: f64,
        output: &Path,
        mode: CutMode,
    ) -> Result<(), MediaError> {
        Self::run(
            &self.ffmpeg,
            Self::trim_args(source, start, duration, output, mode),
        )
        .await?;
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        let stdout = Self::run(&self.ffprobe, Self::probe_args(path)).await?;
        let text = String::from_utf8_lossy(&stdout);
        parse_probe_duration(&text).ok_or_else(|| MediaError::UnexpectedOutput {
            tool: self.ffprobe.display().to_string(),
            output: text.to_string(),
        })
    }
}
