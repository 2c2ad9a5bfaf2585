use std::path::PathBuf;

use serde::Serialize;
use shotsplit_core::types::SceneInterval;
use uuid::Uuid;

use crate::workers::events::{EventHeader, JobSpec};

#[derive(Debug, Serialize)]
pub struct ScenesReconciled {
    pub header: EventHeader,
    pub job: JobSpec,
    pub video_path: PathBuf,
    pub segment_count: usize,
    pub skipped_segments: Vec<usize>,
    pub scenes: Vec<SceneInterval>,
}

impl ScenesReconciled {
    pub const EVENT_TYPE: &'static str = "scenes.reconciled";

    pub fn new(
        parent_event_id: Uuid,
        job: JobSpec,
        video_path: PathBuf,
        segment_count: usize,
        skipped_segments: Vec<usize>,
        scenes: Vec<SceneInterval>,
    ) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            video_path,
            segment_count,
            skipped_segments,
            scenes,
        }
    }
}

header_event!(ScenesReconciled);
