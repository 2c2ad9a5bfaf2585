use serde::Serialize;
use uuid::Uuid;

use crate::workers::events::EventHeader;

/// Identity of one run; the rest of its settings live in the shared config.
#[derive(Clone, Debug, Serialize)]
pub struct JobSpec {
    pub run_id: Uuid,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct RunRequested {
    pub header: EventHeader,
    pub job: JobSpec,
}

impl RunRequested {
    pub const EVENT_TYPE: &'static str = "run.requested";

    pub fn new(job: JobSpec) -> Self {
        Self {
            header: EventHeader::root(),
            job,
        }
    }
}

header_event!(RunRequested);
