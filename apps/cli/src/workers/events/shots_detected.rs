use std::path::PathBuf;

use serde::Serialize;
use shotsplit_core::types::SegmentShots;
use uuid::Uuid;

use crate::workers::events::{EventHeader, JobSpec};

#[derive(Debug, Serialize)]
pub struct ShotsDetected {
    pub header: EventHeader,
    pub job: JobSpec,
    pub video_path: PathBuf,
    pub segment_count: usize,
    /// Segments in order, excluding any skipped after a detection failure.
    pub segments: Vec<SegmentShots>,
    pub skipped_segments: Vec<usize>,
}

impl ShotsDetected {
    pub const EVENT_TYPE: &'static str = "shots.detected";

    pub fn new(
        parent_event_id: Uuid,
        job: JobSpec,
        video_path: PathBuf,
        segment_count: usize,
        segments: Vec<SegmentShots>,
        skipped_segments: Vec<usize>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            video_path,
            segment_count,
            segments,
            skipped_segments,
        }
    }
}

header_event!(ShotsDetected);
