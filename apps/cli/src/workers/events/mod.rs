/// Implements `Event` for a struct with a `header: EventHeader` field and an
/// `EVENT_TYPE` constant.
macro_rules! header_event {
    ($ty:ty) => {
        impl shotsplit_core::events::Event for $ty {
            fn event_id(&self) -> uuid::Uuid {
                self.header.event_id
            }

            fn parent_ids(&self) -> &[uuid::Uuid] {
                &self.header.parent_ids
            }

            fn event_type(&self) -> &'static str {
                Self::EVENT_TYPE
            }

            fn timestamp(&self) -> std::time::SystemTime {
                self.header.timestamp
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    };
}

pub mod clips_cut;
pub mod run_requested;
pub mod scenes_reconciled;
pub mod segments_written;
pub mod shots_detected;
pub mod source_acquired;

use std::time::SystemTime;

pub use clips_cut::*;
pub use run_requested::*;
pub use scenes_reconciled::*;
pub use segments_written::*;
pub use shots_detected::*;
pub use source_acquired::*;

use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize)]
pub struct EventHeader {
    pub event_id: Uuid,
    pub parent_ids: Vec<Uuid>,
    pub timestamp: SystemTime,
}

impl EventHeader {
    pub fn root() -> Self {
        Self {
            event_id: Uuid::new_v4(),
            parent_ids: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn child_of(parent_event_id: Uuid) -> Self {
        Self {
            parent_ids: vec![parent_event_id],
            ..Self::root()
        }
    }
}
