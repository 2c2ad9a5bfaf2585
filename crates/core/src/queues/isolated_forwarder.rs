use std::{future::Future, pin::Pin, sync::Arc};

use tokio::sync::{Notify, mpsc};

pub type StartupTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Background tasks the bus needs; spawn them before the first publish.
pub struct StartupTasks {
    pub tokio: Vec<StartupTask>,
}

const FORWARDER_INBOX: usize = 16;

pub struct IsolatedForwarder<T> {
    inbox_tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> IsolatedForwarder<T> {
    pub fn new(
        output_buffer: usize,
        notify_any: Arc<Notify>,
    ) -> (IsolatedForwarder<T>, mpsc::Receiver<T>, StartupTask) {
        let (inbox_tx, mut inbox_rx) = mpsc::channel::<T>(FORWARDER_INBOX);
        let (out_tx, out_rx) = mpsc::channel::<T>(output_buffer.max(1));

        let drain_task = Box::pin(async move {
            while let Some(value) = inbox_rx.recv().await {
                if out_tx.send(value).await.is_err() {
                    break;
                }
                notify_any.notify_one();
            }
        });

        (IsolatedForwarder { inbox_tx }, out_rx, drain_task)
    }

    pub fn try_send(&self, value: T) -> Result<(), T> {
        self.inbox_tx.try_send(value).map_err(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_and_notifies() {
        let notify = Arc::new(Notify::new());
        let (fwd, mut rx, task) = IsolatedForwarder::new(4, Arc::clone(&notify));
        tokio::spawn(task);

        fwd.try_send(7).unwrap();
        notify.notified().await;
        assert_eq!(rx.try_recv().ok(), Some(7));
    }

    #[test]
    fn full_inbox_hands_value_back() {
        let (fwd, _rx, _task) = IsolatedForwarder::new(1, Arc::new(Notify::new()));
        for n in 0..FORWARDER_INBOX {
            fwd.try_send(n).unwrap();
        }
        assert_eq!(fwd.try_send(99), Err(99));
    }
}
