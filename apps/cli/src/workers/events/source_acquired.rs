use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::workers::events::{EventHeader, JobSpec};

#[derive(Debug, Serialize)]
pub struct SourceAcquired {
    pub header: EventHeader,
    pub job: JobSpec,
    pub video_path: PathBuf,
}

impl SourceAcquired {
    pub const EVENT_TYPE: &'static str = "source.acquired";

    pub fn new(parent_event_id: Uuid, job: JobSpec, video_path: PathBuf) -> Self {
        Self {
            header: EventHeader::child_of(parent_event_id),
            job,
            video_path,
        }
    }
}

header_event!(SourceAcquired);
