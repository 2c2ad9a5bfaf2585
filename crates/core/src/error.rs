use std::path::PathBuf;

use thiserror::Error;

use crate::types::CutClip;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Unexpected {tool} output: {output:?}")]
    UnexpectedOutput { tool: String, output: String },
}

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Downloaded file {path} is missing or empty")]
    MissingOutput { path: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Splitting {video} failed: {source}")]
    SplitFailed {
        video: PathBuf,
        #[source]
        source: MediaError,
    },

    #[error("No segment files were produced in {dir}")]
    NoSegments { dir: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DetectionServiceError {
    #[error("Could not read segment {path}: {source}")]
    ReadSegment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Authentication failed: {reason}")]
    Auth { reason: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Annotation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Annotation operation {operation} failed with code {code}: {message}")]
    Operation {
        operation: String,
        code: i64,
        message: String,
    },

    #[error("Malformed annotation response: {reason}")]
    MalformedResponse { reason: String },
}

/// Why a scene interval was dropped instead of cut.
#[derive(Error, Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum InvalidSceneInterval {
    #[error("start {start:.3}s is negative")]
    NegativeStart { start: f64 },

    #[error("duration is not positive ({start:.3}s..{end:.3}s)")]
    NonPositiveDuration { start: f64, end: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Clip {index} at {path} is missing or empty after cutting")]
pub struct CutVerificationError {
    pub index: usize,
    pub path: PathBuf,
}

#[derive(Error, Debug)]
pub enum CutError {
    #[error("Cutting clip {index} failed: {source}")]
    Engine {
        index: usize,
        #[source]
        source: MediaError,
    },

    #[error(transparent)]
    Verification(#[from] CutVerificationError),

    #[error("Cut task for clip {index} did not finish: {reason}")]
    Aborted { index: usize, reason: String },
}

impl CutError {
    pub fn index(&self) -> usize {
        match self {
            CutError::Engine { index, .. } => *index,
            CutError::Verification(e) => e.index,
            CutError::Aborted { index, .. } => *index,
        }
    }
}

/// Aggregate failure of the cut stage. Clips in `written` stay on disk.
#[derive(Error, Debug)]
#[error("{}", summarize_batch(.failures, .written))]
pub struct CutBatchError {
    pub failures: Vec<CutError>,
    pub written: Vec<CutClip>,
}

fn summarize_batch(failures: &[CutError], written: &[CutClip]) -> String {
    let details = failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "{} of {} clip(s) failed: {}",
        failures.len(),
        failures.len() + written.len(),
        details
    )
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Part duration must be a positive number of seconds, got {0}")]
    InvalidPartDuration(f64),

    #[error("Cut concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Source URL is empty")]
    EmptyUrl,

    #[error("Downloads and cuts directories must differ (both are {0})")]
    SharedDirectories(PathBuf),

    #[error("No credentials: set {env_var} or pass a service-account key file")]
    MissingCredentials { env_var: String },

    #[error("Invalid credentials file {path}: {reason}")]
    InvalidCredentials { path: PathBuf, reason: String },
}
