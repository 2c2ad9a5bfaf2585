use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::InvalidSceneInterval;

/// Round seconds to millisecond precision.
pub fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// A detected shot, in seconds relative to the segment it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotBoundary {
    pub start: f64,
    pub end: f64,
}

impl ShotBoundary {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Place this boundary on the source timeline, `offset` seconds in.
    pub fn shifted(self, offset: f64) -> SceneInterval {
        SceneInterval {
            start: round_millis(self.start + offset),
            end: round_millis(self.end + offset),
        }
    }
}

impl From<ShotBoundary> for SceneInterval {
    fn from(shot: ShotBoundary) -> Self {
        SceneInterval {
            start: shot.start,
            end: shot.end,
        }
    }
}

/// A shot on the full source timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneInterval {
    pub start: f64,
    pub end: f64,
}

impl SceneInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        round_millis(self.end - self.start)
    }

    /// Returns the cut duration, or why this interval must not be cut.
    pub fn validate(&self) -> Result<f64, InvalidSceneInterval> {
        if self.start < 0.0 {
            return Err(InvalidSceneInterval::NegativeStart { start: self.start });
        }
        let duration = self.duration();
        if duration.is_nan() || duration <= 0.0 {
            return Err(InvalidSceneInterval::NonPositiveDuration {
                start: self.start,
                end: self.end,
            });
        }
        Ok(duration)
    }
}

/// Nominal span of one segment on the source timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpan {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

/// One segment file written by the segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFile {
    pub index: usize,
    pub path: PathBuf,
    /// Where this segment begins on the source timeline, in seconds.
    pub start_offset: f64,
}

/// Shots detected in one segment, kept in segment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentShots {
    pub segment: SegmentFile,
    pub shots: Vec<ShotBoundary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutClip {
    pub index: usize,
    pub path: PathBuf,
    pub interval: SceneInterval,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedInterval {
    pub index: usize,
    pub interval: SceneInterval,
    pub reason: InvalidSceneInterval,
}

/// Structured outcome of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub source: PathBuf,
    pub segments: usize,
    pub skipped_segments: Vec<usize>,
    pub scenes: Vec<SceneInterval>,
    pub clips: Vec<CutClip>,
    pub skipped_intervals: Vec<SkippedInterval>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_interval_is_invalid() {
        let err = SceneInterval::new(5.0, 5.0).validate().unwrap_err();
        assert_eq!(
            err,
            InvalidSceneInterval::NonPositiveDuration {
                start: 5.0,
                end: 5.0
            }
        );
    }

    #[test]
    fn negative_start_is_invalid() {
        let err = SceneInterval::new(-1.0, 3.0).validate().unwrap_err();
        assert_eq!(err, InvalidSceneInterval::NegativeStart { start: -1.0 });
    }

    #[test]
    fn valid_interval_reports_duration() {
        assert_eq!(SceneInterval::new(2.0, 7.0).validate().unwrap(), 5.0);
        assert_eq!(SceneInterval::new(0.1, 0.3).validate().unwrap(), 0.2);
    }

    #[test]
    fn shifting_keeps_millisecond_precision() {
        let scene = ShotBoundary::new(0.1, 2.2).shifted(1800.0004);
        assert_eq!(scene, SceneInterval::new(1800.1, 1802.2));
    }
}
