use std::sync::Arc;

use async_trait::async_trait;
use shotsplit_core::{
    config::PipelineConfig,
    events::{EnrichedEvent, EventBus, expect},
    queues::QueueKind,
    reconciler::{first_regression, reconcile_with},
    workers::{InputSpec, SubscriptionSpec, Worker},
};
use tracing::{info, warn};

use crate::workers::events::{ScenesReconciled, ShotsDetected};

pub struct ReconcileTimelineWorker {
    config: Arc<PipelineConfig>,
}

impl ReconcileTimelineWorker {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Worker for ReconcileTimelineWorker {
    const SUBSCRIBER_ID: &'static str = "timeline.reconcile";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec {
                event_type: ShotsDetected::EVENT_TYPE,
                queue_kind: QueueKind::FifoDropOldest { capacity: 4 },
            }],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<ShotsDetected>(&event.event, ShotsDetected::EVENT_TYPE)?;

        let scenes = reconcile_with(&req.segments, self.config.timeline_mode);
        if let Some(index) = first_regression(&scenes) {
            warn!(
                index,
                mode = ?self.config.timeline_mode,
                "Scene timeline is not monotonic; clips may overlap"
            );
        }
        info!(scenes = scenes.len(), "Timeline reconciled");

        bus.publish(Arc::new(ScenesReconciled::new(
            event.event.event_id(),
            req.job.clone(),
            req.video_path.clone(),
            req.segment_count,
            req.skipped_segments.clone(),
            scenes,
        )));
        Ok(())
    }
}
