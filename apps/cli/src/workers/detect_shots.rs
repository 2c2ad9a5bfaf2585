use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use shotsplit_core::{
    annotation::ShotAnnotator,
    config::{DetectionFailurePolicy, PipelineConfig},
    detector::detect_shots,
    events::{EnrichedEvent, EventBus, expect},
    queues::QueueKind,
    types::SegmentShots,
    workers::{InputSpec, SubscriptionSpec, Worker},
};
use tracing::{info, warn};

use crate::workers::events::{SegmentsWritten, ShotsDetected};

/// Runs shot detection over every segment, one at a time, in order.
pub struct DetectShotsWorker {
    config: Arc<PipelineConfig>,
    annotator: Arc<dyn ShotAnnotator>,
}

impl DetectShotsWorker {
    pub fn new(config: Arc<PipelineConfig>, annotator: Arc<dyn ShotAnnotator>) -> Self {
        Self { config, annotator }
    }
}

#[async_trait]
impl Worker for DetectShotsWorker {
    const SUBSCRIBER_ID: &'static str = "shots.detect";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![InputSpec {
                event_type: SegmentsWritten::EVENT_TYPE,
                queue_kind: QueueKind::FifoDropOldest { capacity: 4 },
            }],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> anyhow::Result<()> {
        let req = expect::<SegmentsWritten>(&event.event, SegmentsWritten::EVENT_TYPE)?;

        let mut detected = Vec::with_capacity(req.segments.len());
        let mut skipped = Vec::new();

        for segment in &req.segments {
            match detect_shots(self.annotator.as_ref(), &segment.path).await {
                Ok(shots) => detected.push(SegmentShots {
                    segment: segment.clone(),
                    shots,
                }),
                Err(e) => match self.config.detection_failure_policy {
                    DetectionFailurePolicy::Abort => {
                        return Err(e).with_context(|| {
                            format!("Shot detection failed for {}", segment.path.display())
                        });
                    }
                    DetectionFailurePolicy::SkipSegment => {
                        warn!(segment = segment.index, error = %e, "Shot detection failed, skipping segment");
                        skipped.push(segment.index);
                    }
                },
            }
        }

        info!(
            segments = detected.len(),
            skipped = skipped.len(),
            shots = detected.iter().map(|s| s.shots.len()).sum::<usize>(),
            "Detection finished"
        );

        bus.publish(Arc::new(ShotsDetected::new(
            event.event.event_id(),
            req.job.clone(),
            req.video_path.clone(),
            req.segments.len(),
            detected,
            skipped,
        )));
        Ok(())
    }
}
