use serde::Serialize;
use shotsplit_core::types::RunSummary;
use uuid::Uuid;

use crate::workers::events::{EventHeader, JobSpec};

#[derive(Debug, Serialize)]
pub struct ClipsCut {
    pub header: EventHeader,
    pub job: JobSpec,
    pub summary: RunSummary,
}

impl ClipsCut {
    pub const EVENT_TYPE: &'static str = "clips.cut";

    pub fn new(parent_event_id: Uuid, job: JobSpec, summary: RunSummary) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            summary,
        }
    }
}

header_event!(ClipsCut);
