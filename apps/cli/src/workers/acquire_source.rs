use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use shotsplit_core::{
    config::PipelineConfig,
    events::{EnrichedEvent, EventBus, expect},
    queues::QueueKind,
    source::VideoSource,
    workers::{InputSpec, SubscriptionSpec, Worker},
};
use tracing::info;

use crate::workers::events::{RunRequested, SourceAcquired};

pub struct AcquireSourceWorker {
    config: Arc<PipelineConfig>,
    source: Arc<dyn VideoSource>,
}

impl AcquireSourceWorker {
    pub fn new(config: Arc<PipelineConfig>, source: Arc<dyn VideoSource>) -> Self {
        Self { config, source }
    }
}

#[async_trait]
impl Worker for AcquireSourceWorker {
    const SUBSCRIBER_ID: &'static str = "source.acquire";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec {
                event_type: RunRequested::EVENT_TYPE,
                queue_kind: QueueKind::FifoDropOldest { capacity: 4 },
            }],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<RunRequested>(&event.event, RunRequested::EVENT_TYPE)?;

        self.config
            .ensure_dirs()
            .await
            .context("Failed to create working directories")?;

        let target = self.config.source_video_path();
        info!(url = %req.job.url, target = %target.display(), "Downloading source video");
        let video_path = self.source.fetch(&req.job.url, &target).await?;

        bus.publish(Arc::new(SourceAcquired::new(
            event.event.event_id(),
            req.job.clone(),
            video_path,
        )));
        Ok(())
    }
}
