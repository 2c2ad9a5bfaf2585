use std::sync::Arc;

use async_trait::async_trait;
use shotsplit_core::{
    events::{EnrichedEvent, EventBus, downcast_ref},
    queues::QueueKind,
    types::RunSummary,
    workers::{InputSpec, PipelineFailed, SubscriptionSpec, Worker},
};
use tokio::sync::oneshot;
use tracing::debug;

use crate::workers::events::ClipsCut;

pub type RunOutcome = Result<RunSummary, PipelineFailed>;

/// Resolves the run's completion channel with the first terminal event.
pub struct CliCompletionSinkWorker {
    done: Option<oneshot::Sender<RunOutcome>>,
}

impl CliCompletionSinkWorker {
    pub fn new(done: oneshot::Sender<RunOutcome>) -> Self {
        Self { done: Some(done) }
    }

    fn resolve(&mut self, outcome: RunOutcome) {
        match self.done.take() {
            Some(done) => {
                if done.send(outcome).is_err() {
                    debug!("Completion receiver dropped before the run finished");
                }
            }
            None => debug!("Run already resolved, ignoring terminal event"),
        }
    }
}

#[async_trait]
impl Worker for CliCompletionSinkWorker {
    const SUBSCRIBER_ID: &'static str = "cli.completion_sink";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![
                InputSpec {
                    event_type: ClipsCut::EVENT_TYPE,
                    queue_kind: QueueKind::Isolated { output_buffer: 4 },
                },
                InputSpec {
                    event_type: PipelineFailed::EVENT_TYPE,
                    queue_kind: QueueKind::FifoDropOldest { capacity: 4 },
                },
            ],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        if let Some(done) = downcast_ref::<ClipsCut>(&event.event) {
            self.resolve(Ok(done.summary.clone()));
        } else if let Some(failed) = downcast_ref::<PipelineFailed>(&event.event) {
            self.resolve(Err(failed.clone()));
        }
        Ok(())
    }
}
