use std::sync::Arc;

use async_trait::async_trait;
use shotsplit_core::{
    config::PipelineConfig,
    events::{EnrichedEvent, EventBus, expect},
    media::MediaEngine,
    queues::QueueKind,
    segmenter::segment,
    workers::{InputSpec, SubscriptionSpec, Worker},
};

use crate::workers::events::{SegmentsWritten, SourceAcquired};

pub struct SplitSegmentsWorker {
    config: Arc<PipelineConfig>,
    engine: Arc<dyn MediaEngine>,
}

impl SplitSegmentsWorker {
    pub fn new(config: Arc<PipelineConfig>, engine: Arc<dyn MediaEngine>) -> Self {
        Self { config, engine }
    }
}

#[async_trait]
impl Worker for SplitSegmentsWorker {
    const SUBSCRIBER_ID: &'static str = "segments.split";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec {
                event_type: SourceAcquired::EVENT_TYPE,
                queue_kind: QueueKind::FifoDropOldest { capacity: 4 },
            }],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<SourceAcquired>(&event.event, SourceAcquired::EVENT_TYPE)?;

        let segments = segment(
            self.engine.as_ref(),
            &req.video_path,
            self.config.part_duration_secs,
            &self.config.downloads_dir,
        )
        .await?
        .segments;

        bus.publish(Arc::new(SegmentsWritten::new(
            event.event.event_id(),
            req.job.clone(),
            req.video_path.clone(),
            segments,
        )));
        Ok(())
    }
}
