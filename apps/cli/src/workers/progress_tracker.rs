use std::sync::Arc;

use async_trait::async_trait;
use shotsplit_core::{
    events::{EnrichedEvent, EventBus, to_json},
    queues::QueueKind,
    state::PipelineState,
    workers::{InputSpec, PipelineFailed, SubscriptionSpec, Worker},
};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::workers::events::{
    ClipsCut, RunRequested, ScenesReconciled, SegmentsWritten, ShotsDetected, SourceAcquired,
};

/// Follows the event stream and publishes the run's state on a watch channel.
pub struct ProgressTrackerWorker {
    state: watch::Sender<PipelineState>,
}

impl ProgressTrackerWorker {
    pub fn new(state: watch::Sender<PipelineState>) -> Self {
        Self { state }
    }

    /// State a run is in once `event_type` has been published.
    pub fn state_after(event_type: &str) -> Option<PipelineState> {
        match event_type {
            RunRequested::EVENT_TYPE => Some(PipelineState::Downloading),
            SourceAcquired::EVENT_TYPE => Some(PipelineState::Segmenting),
            SegmentsWritten::EVENT_TYPE => Some(PipelineState::Detecting),
            ShotsDetected::EVENT_TYPE => Some(PipelineState::Reconciling),
            ScenesReconciled::EVENT_TYPE => Some(PipelineState::Cutting),
            ClipsCut::EVENT_TYPE => Some(PipelineState::Done),
            PipelineFailed::EVENT_TYPE => Some(PipelineState::Failed),
            _ => None,
        }
    }
}

fn input(event_type: &'static str) -> InputSpec {
    InputSpec {
        event_type,
        queue_kind: QueueKind::FifoDropOldest { capacity: 8 },
    }
}

#[async_trait]
impl Worker for ProgressTrackerWorker {
    const SUBSCRIBER_ID: &'static str = "progress.tracker";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![
                input(RunRequested::EVENT_TYPE),
                input(SourceAcquired::EVENT_TYPE),
                input(SegmentsWritten::EVENT_TYPE),
                input(ShotsDetected::EVENT_TYPE),
                input(ScenesReconciled::EVENT_TYPE),
                input(ClipsCut::EVENT_TYPE),
                input(PipelineFailed::EVENT_TYPE),
            ],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        debug!(
            seq = event.ingest_seq,
            run_id = %event.run_id,
            event = %to_json(event.event.as_ref()),
            "Event"
        );

        let Some(next) = Self::state_after(event.event.event_type()) else {
            return Ok(());
        };

        // Inputs are drained round-robin, so a stage can be reported after its
        // successor. Late or repeated notifications are ignored.
        self.state.send_if_modified(|current| match current.advance(next) {
            Ok(advanced) => {
                *current = advanced;
                true
            }
            Err(e) => {
                trace!(error = %e, "Ignoring stale progress");
                false
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_event_maps_to_a_later_state() {
        let order = [
            RunRequested::EVENT_TYPE,
            SourceAcquired::EVENT_TYPE,
            SegmentsWritten::EVENT_TYPE,
            ShotsDetected::EVENT_TYPE,
            ScenesReconciled::EVENT_TYPE,
            ClipsCut::EVENT_TYPE,
        ];
        let mut state = PipelineState::Idle;
        for event_type in order {
            state = state
                .advance(ProgressTrackerWorker::state_after(event_type).unwrap())
                .unwrap();
        }
        assert_eq!(state, PipelineState::Done);
        assert_eq!(
            ProgressTrackerWorker::state_after(PipelineFailed::EVENT_TYPE),
            Some(PipelineState::Failed)
        );
        assert_eq!(ProgressTrackerWorker::state_after("unknown"), None);
    }
}
