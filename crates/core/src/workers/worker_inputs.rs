use std::sync::Arc;

use tokio::sync::{Notify, mpsc};

use crate::{events::EnrichedEvent, queues::FifoDropOldestReceiver};

pub enum FifoReceiver {
    FifoDropOldest(FifoDropOldestReceiver<Arc<EnrichedEvent>>),
    Isolated(mpsc::Receiver<Arc<EnrichedEvent>>),
}

impl FifoReceiver {
    fn try_recv(&mut self) -> Option<Arc<EnrichedEvent>> {
        match self {
            FifoReceiver::FifoDropOldest(r) => r.try_recv(),
            FifoReceiver::Isolated(r) => r.try_recv().ok(),
        }
    }
}

pub struct FifoInput {
    pub event_type: &'static str,
    pub receiver: FifoReceiver,
}

pub struct InputItem {
    pub event_type: &'static str,
    pub event: Arc<EnrichedEvent>,
}

/// All inboxes of one subscriber, drained round-robin.
pub struct WorkerInputs {
    fifos: Vec<FifoInput>,
    notify_any: Arc<Notify>,
    fifo_index: usize,
}

impl WorkerInputs {
    pub fn new(fifos: Vec<FifoInput>, notify_any: Arc<Notify>) -> Self {
        Self {
            fifos,
            notify_any,
            fifo_index: 0,
        }
    }

    /// Wait for the next event on any input.
    pub async fn next(&mut self) -> InputItem {
        loop {
            for _ in 0..self.fifos.len() {
                let i = self.fifo_index;
                self.fifo_index = (self.fifo_index + 1) % self.fifos.len();
                let fifo = &mut self.fifos[i];

                if let Some(event) = fifo.receiver.try_recv() {
                    return InputItem {
                        event_type: fifo.event_type,
                        event,
                    };
                }
            }
            self.notify_any.notified().await;
        }
    }
}
