use std::sync::Arc;

use anyhow::Context;
use shotsplit_core::{
    annotation::ShotAnnotator,
    config::PipelineConfig,
    events::{BusConfig, EventBus, EventBusBuilder},
    media::MediaEngine,
    source::VideoSource,
    state::PipelineState,
    workers::{Worker, WorkerWiring},
};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::workers::{
    acquire_source::AcquireSourceWorker,
    cli_completion_sink::{CliCompletionSinkWorker, RunOutcome},
    cut_clips::CutClipsWorker,
    detect_shots::DetectShotsWorker,
    events::{JobSpec, RunRequested},
    progress_tracker::ProgressTrackerWorker,
    reconcile_timeline::ReconcileTimelineWorker,
    split_segments::SplitSegmentsWorker,
};

/// External systems a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn VideoSource>,
    pub engine: Arc<dyn MediaEngine>,
    pub annotator: Arc<dyn ShotAnnotator>,
}

pub struct PipelineHandle {
    pub bus: Arc<EventBus>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub done_rx: oneshot::Receiver<RunOutcome>,
    pub state_rx: watch::Receiver<PipelineState>,
}

impl PipelineHandle {
    /// Kick off the run for `url`.
    pub fn submit(&self, url: impl Into<String>) {
        self.bus.publish(Arc::new(RunRequested::new(JobSpec {
            run_id: self.bus.run_id(),
            url: url.into(),
        })));
    }

    /// Wait for the run to finish, then stop every worker.
    pub async fn wait(self) -> anyhow::Result<RunOutcome> {
        let outcome = self
            .done_rx
            .await
            .context("Pipeline stopped without reporting an outcome");
        let _ = self.shutdown_tx.send(());

        let stats = self.bus.stats();
        let drops = self.bus.drops_by_subscriber();
        if drops.is_empty() {
            debug!(unrouted = stats.unrouted(), "Event bus closed");
        } else {
            warn!(
                unrouted = stats.unrouted(),
                dropped = stats.dropped(),
                ?drops,
                "Event bus dropped events during the run"
            );
        }
        outcome
    }
}

fn spawn_worker<W: Worker>(
    worker: W,
    wiring: &mut WorkerWiring,
    bus: &Arc<EventBus>,
    shutdown_tx: &broadcast::Sender<()>,
) -> anyhow::Result<()> {
    let inputs = wiring.take_or_err(W::SUBSCRIBER_ID)?;
    tokio::spawn(worker.run(inputs, Arc::clone(bus), shutdown_tx.subscribe()));
    debug!(worker = W::SUBSCRIBER_ID, "Worker started");
    Ok(())
}

pub fn start_pipeline(
    config: Arc<PipelineConfig>,
    collaborators: Collaborators,
) -> anyhow::Result<PipelineHandle> {
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (done_tx, done_rx) = oneshot::channel::<RunOutcome>();
    let (state_tx, state_rx) = watch::channel(PipelineState::Idle);

    let builder = EventBusBuilder::new(BusConfig::new(Uuid::new_v4()))
        .subscribe(AcquireSourceWorker::subscription())
        .subscribe(SplitSegmentsWorker::subscription())
        .subscribe(DetectShotsWorker::subscription())
        .subscribe(ReconcileTimelineWorker::subscription())
        .subscribe(CutClipsWorker::subscription())
        .subscribe(ProgressTrackerWorker::subscription())
        .subscribe(CliCompletionSinkWorker::subscription());

    let (bus, mut wiring, tasks) = builder.build()?;
    let bus = Arc::new(bus);

    // isolated drain tasks must run before anything is published
    for t in tasks.tokio {
        tokio::spawn(t);
    }

    let Collaborators {
        source,
        engine,
        annotator,
    } = collaborators;

    spawn_worker(
        AcquireSourceWorker::new(Arc::clone(&config), source),
        &mut wiring,
        &bus,
        &shutdown_tx,
    )?;
    spawn_worker(
        SplitSegmentsWorker::new(Arc::clone(&config), Arc::clone(&engine)),
        &mut wiring,
        &bus,
        &shutdown_tx,
    )?;
    spawn_worker(
        DetectShotsWorker::new(Arc::clone(&config), annotator),
        &mut wiring,
        &bus,
        &shutdown_tx,
    )?;
    spawn_worker(
        ReconcileTimelineWorker::new(Arc::clone(&config)),
        &mut wiring,
        &bus,
        &shutdown_tx,
    )?;
    spawn_worker(
        CutClipsWorker::new(Arc::clone(&config), engine),
        &mut wiring,
        &bus,
        &shutdown_tx,
    )?;
    spawn_worker(
        ProgressTrackerWorker::new(state_tx),
        &mut wiring,
        &bus,
        &shutdown_tx,
    )?;
    spawn_worker(
        CliCompletionSinkWorker::new(done_tx),
        &mut wiring,
        &bus,
        &shutdown_tx,
    )?;

    debug!(run_id = %bus.run_id(), "Pipeline ready");

    Ok(PipelineHandle {
        bus,
        shutdown_tx,
        done_rx,
        state_rx,
    })
}
