use std::path::PathBuf;

use serde::Serialize;
use shotsplit_core::types::SegmentFile;
use uuid::Uuid;

use crate::workers::events::{EventHeader, JobSpec};

#[derive(Debug, Serialize)]
pub struct SegmentsWritten {
    pub header: EventHeader,
    pub job: JobSpec,
    pub video_path: PathBuf,
    pub segments: Vec<SegmentFile>,
}

impl SegmentsWritten {
    pub const EVENT_TYPE: &'static str = "segments.written";

    pub fn new(
        parent_event_id: Uuid,
        job: JobSpec,
        video_path: PathBuf,
        segments: Vec<SegmentFile>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            video_path,
            segments,
        }
    }
}

header_event!(SegmentsWritten);
