use std::sync::Arc;

use async_trait::async_trait;
use shotsplit_core::{
    config::PipelineConfig,
    cutter::cut,
    events::{EnrichedEvent, EventBus, expect},
    media::MediaEngine,
    queues::QueueKind,
    types::RunSummary,
    workers::{InputSpec, SubscriptionSpec, Worker},
};

use crate::workers::events::{ClipsCut, ScenesReconciled};

pub struct CutClipsWorker {
    config: Arc<PipelineConfig>,
    engine: Arc<dyn MediaEngine>,
}

impl CutClipsWorker {
    pub fn new(config: Arc<PipelineConfig>, engine: Arc<dyn MediaEngine>) -> Self {
        Self { config, engine }
    }
}

#[async_trait]
impl Worker for CutClipsWorker {
    const SUBSCRIBER_ID: &'static str = "clips.cut";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec {
                event_type: ScenesReconciled::EVENT_TYPE,
                queue_kind: QueueKind::FifoDropOldest { capacity: 4 },
            }],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<ScenesReconciled>(&event.event, ScenesReconciled::EVENT_TYPE)?;

        let report = cut(
            Arc::clone(&self.engine),
            &self.config,
            &req.video_path,
            &req.scenes,
        )
        .await;
        let (clips, skipped_intervals) = report.into_result()?;

        let summary = RunSummary {
            source: req.video_path.clone(),
            segments: req.segment_count,
            skipped_segments: req.skipped_segments.clone(),
            scenes: req.scenes.clone(),
            clips,
            skipped_intervals,
        };

        bus.publish(Arc::new(ClipsCut::new(
            event.event.event_id(),
            req.job.clone(),
            summary,
        )));
        Ok(())
    }
}
