use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::{
    events::{EnrichedEvent, EventBus},
    workers::{PipelineFailed, SubscriptionSpec, WorkerInputs},
};

#[async_trait]
pub trait Worker: Send + Sized + 'static {
    const SUBSCRIBER_ID: &'static str;

    fn subscription() -> SubscriptionSpec;

    async fn handle(&mut self, event: Arc<EnrichedEvent>, bus: &EventBus) -> Result<()>;

    /// Handle events until shutdown. An error from `handle` is published as
    /// `PipelineFailed` and the worker keeps serving.
    async fn run(
        mut self,
        mut inputs: WorkerInputs,
        bus: Arc<EventBus>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        loop {
            // Pending events are handled before a shutdown is honoured.
            tokio::select! {
                biased;
                item = inputs.next() => {
                    let parent = Arc::clone(&item.event.event);
                    debug!(
                        worker = Self::SUBSCRIBER_ID,
                        event_type = item.event_type,
                        seq = item.event.ingest_seq,
                        queued = ?item.event.ingested_at.elapsed(),
                        "Handling event"
                    );
                    if let Err(e) = self.handle(item.event, &bus).await {
                        let message = format!("{e:#}");
                        error!(worker = Self::SUBSCRIBER_ID, error = %message, "Stage failed");
                        bus.publish(Arc::new(PipelineFailed::new(
                            parent.as_ref(),
                            Self::SUBSCRIBER_ID,
                            message,
                        )));
                    }
                }
                _ = shutdown.recv() => {
                    debug!(worker = Self::SUBSCRIBER_ID, "Shutting down");
                    return Ok(());
                }
            }
        }
    }
}
