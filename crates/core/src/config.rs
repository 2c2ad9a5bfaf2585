use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::ConfigError;

pub const DEFAULT_PART_DURATION_SECS: f64 = 1800.0;
pub const DEFAULT_DETECTION_MODEL: &str = "builtin/latest";
pub const DEFAULT_ANNOTATION_ENDPOINT: &str = "https://videointelligence.googleapis.com";
pub const DEFAULT_OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub const SOURCE_FILE_NAME: &str = "video.mp4";
pub const SEGMENT_PREFIX: &str = "part";
pub const CLIP_PREFIX: &str = "clip_";
pub const MEDIA_EXTENSION: &str = "mp4";

/// How per-segment shot offsets are placed on the source timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimelineMode {
    /// Append segment-local offsets as they are.
    Concatenate,
    /// Add each segment's start offset before appending.
    #[default]
    SegmentOffset,
}

/// What to do when the annotation service fails for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionFailurePolicy {
    #[default]
    Abort,
    SkipSegment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CutMode {
    #[default]
    StreamCopy,
    Reencode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub gcloud: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            yt_dlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            gcloud: PathBuf::from("gcloud"),
        }
    }
}

/// Settings for one pipeline run. Built once at startup and shared by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source_url: String,
    pub downloads_dir: PathBuf,
    pub cuts_dir: PathBuf,
    pub part_duration_secs: f64,
    pub detection_model: String,
    pub annotation_endpoint: String,
    pub operation_poll_interval: Duration,
    pub credentials_path: Option<PathBuf>,
    pub timeline_mode: TimelineMode,
    pub detection_failure_policy: DetectionFailurePolicy,
    pub cut_mode: CutMode,
    pub cut_concurrency: usize,
    pub tools: ToolPaths,
}

impl PipelineConfig {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            downloads_dir: PathBuf::from("downloads"),
            cuts_dir: PathBuf::from("cuts"),
            part_duration_secs: DEFAULT_PART_DURATION_SECS,
            detection_model: DEFAULT_DETECTION_MODEL.to_string(),
            annotation_endpoint: DEFAULT_ANNOTATION_ENDPOINT.to_string(),
            operation_poll_interval: DEFAULT_OPERATION_POLL_INTERVAL,
            credentials_path: None,
            timeline_mode: TimelineMode::default(),
            detection_failure_policy: DetectionFailurePolicy::default(),
            cut_mode: CutMode::default(),
            cut_concurrency: default_concurrency(),
            tools: ToolPaths::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if !(self.part_duration_secs.is_finite() && self.part_duration_secs > 0.0) {
            return Err(ConfigError::InvalidPartDuration(self.part_duration_secs));
        }
        if self.cut_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.downloads_dir == self.cuts_dir {
            return Err(ConfigError::SharedDirectories(self.cuts_dir.clone()));
        }
        Ok(())
    }

    /// Create the working directories if they do not exist yet.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.downloads_dir).await?;
        fs::create_dir_all(&self.cuts_dir).await?;
        Ok(())
    }

    pub fn source_video_path(&self) -> PathBuf {
        self.downloads_dir.join(SOURCE_FILE_NAME)
    }

    /// ffmpeg output pattern for segment files, e.g. `downloads/part%03d.mp4`.
    pub fn segment_pattern(&self) -> PathBuf {
        segment_pattern(&self.downloads_dir)
    }

    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.cuts_dir
            .join(format!("{CLIP_PREFIX}{index:04}.{MEDIA_EXTENSION}"))
    }
}

pub fn segment_pattern(dir: &Path) -> PathBuf {
    dir.join(format!("{SEGMENT_PREFIX}%03d.{MEDIA_EXTENSION}"))
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
