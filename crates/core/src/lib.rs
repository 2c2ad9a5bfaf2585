pub mod annotation;
pub mod config;
pub mod cutter;
pub mod detector;
pub mod error;
pub mod events;
pub mod files;
pub mod format;
pub mod media;
pub mod queues;
pub mod reconciler;
pub mod routes;
pub mod segmenter;
pub mod source;
pub mod state;
pub mod types;
pub mod workers;

pub use annotation::{ShotAnnotator, VideoIntelligenceClient, resolve_token_source};
pub use config::{CutMode, DetectionFailurePolicy, PipelineConfig, TimelineMode, ToolPaths};
pub use cutter::{CutReport, cut};
pub use detector::detect_shots;
pub use error::{
    AcquisitionError, ConfigError, CutBatchError, CutError, CutVerificationError,
    DetectionServiceError, InvalidSceneInterval, MediaError, SegmentationError,
};
pub use format::{format_elapsed, format_summary, format_timestamp};
pub use media::{Ffmpeg, MediaEngine};
pub use reconciler::{first_regression, reconcile, reconcile_with};
pub use segmenter::{Segmentation, plan_segments, segment};
pub use source::{VideoSource, YtDlp};
pub use state::{PipelineState, StateTransitionError};
pub use types::{
    CutClip, RunSummary, SceneInterval, SegmentFile, SegmentShots, ShotBoundary, SkippedInterval,
};
