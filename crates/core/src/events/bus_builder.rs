use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::Result;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
    events::{EnrichedEvent, EventBus},
    queues::{FifoDropOldestQueue, IsolatedForwarder, QueueKind, StartupTasks},
    routes::{Route, RouteInbox, Routes},
    workers::{FifoInput, FifoReceiver, SubscriptionSpec, WorkerInputs, WorkerWiring},
};

pub struct BusConfig {
    pub run_id: Uuid,
    /// Log unrouted publishes as errors instead of debug noise.
    pub strict_routing: bool,
}

impl BusConfig {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            strict_routing: true,
        }
    }
}

#[derive(Default)]
pub struct BusStats {
    unrouted_publish_total: AtomicU64,
    dropped_total: AtomicU64,
}

impl BusStats {
    pub fn record_unrouted(&self) {
        self.unrouted_publish_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self) {
        self.dropped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unrouted(&self) -> u64 {
        self.unrouted_publish_total.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }
}

fn validate(subs: &[SubscriptionSpec]) -> Result<()> {
    let mut seen_subscribers: HashSet<&'static str> = HashSet::new();
    for s in subs {
        if s.subscriber_id.trim().is_empty() {
            anyhow::bail!("empty subscriber_id");
        }
        if !seen_subscribers.insert(s.subscriber_id) {
            anyhow::bail!("duplicate subscriber_id={}", s.subscriber_id);
        }
        if s.inputs.is_empty() {
            anyhow::bail!("subscriber_id={} has no inputs", s.subscriber_id);
        }

        let mut seen_inputs: HashSet<&'static str> = HashSet::new();
        for i in &s.inputs {
            if i.event_type.trim().is_empty() {
                anyhow::bail!("subscriber_id={} has empty event_type", s.subscriber_id);
            }
            if !seen_inputs.insert(i.event_type) {
                anyhow::bail!(
                    "subscriber_id={} has duplicate input event_type={}",
                    s.subscriber_id,
                    i.event_type
                );
            }

            match i.queue_kind {
                QueueKind::FifoDropOldest { capacity } => {
                    anyhow::ensure!(capacity > 0, "capacity must be > 0")
                }
                QueueKind::Isolated { output_buffer } => {
                    anyhow::ensure!(output_buffer > 0, "output_buffer must be > 0")
                }
            }
        }
    }
    Ok(())
}

pub struct EventBusBuilder {
    cfg: BusConfig,
    subs: Vec<SubscriptionSpec>,
}

impl EventBusBuilder {
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            subs: Vec::new(),
        }
    }

    pub fn subscribe(mut self, s: SubscriptionSpec) -> Self {
        self.subs.push(s);
        self
    }

    /// Validate subscriptions and wire one inbox per (subscriber, event type).
    ///
    /// The returned startup tasks must be spawned before anything publishes.
    pub fn build(self) -> Result<(EventBus, WorkerWiring, StartupTasks)> {
        validate(&self.subs)?;

        let mut routes: HashMap<&'static str, Vec<Route>> = HashMap::new();
        let mut wiring: HashMap<&'static str, WorkerInputs> = HashMap::new();
        let mut tasks = StartupTasks { tokio: Vec::new() };

        for spec in self.subs {
            let notify_any = Arc::new(Notify::new());
            let mut fifos = Vec::new();

            for input in spec.inputs {
                let drops_total = Arc::new(AtomicU64::new(0));

                let (inbox, receiver) = match input.queue_kind {
                    QueueKind::FifoDropOldest { capacity } => {
                        let q =
                            Arc::new(FifoDropOldestQueue::new(capacity, Arc::clone(&notify_any)));
                        let rx = q.receiver();
                        (RouteInbox::FifoDropOldest(q), FifoReceiver::FifoDropOldest(rx))
                    }
                    QueueKind::Isolated { output_buffer } => {
                        let (fwd, out_rx, drain_task) =
                            IsolatedForwarder::<Arc<EnrichedEvent>>::new(
                                output_buffer,
                                Arc::clone(&notify_any),
                            );
                        tasks.tokio.push(drain_task);
                        (RouteInbox::Isolated(fwd), FifoReceiver::Isolated(out_rx))
                    }
                };

                routes.entry(input.event_type).or_default().push(Route {
                    subscriber_id: spec.subscriber_id,
                    inbox,
                    drops_total,
                });
                fifos.push(FifoInput {
                    event_type: input.event_type,
                    receiver,
                });
            }

            wiring.insert(spec.subscriber_id, WorkerInputs::new(fifos, notify_any));
        }

        let bus = EventBus::new(
            self.cfg,
            Routes { table: routes },
            Arc::new(BusStats::default()),
        );
        Ok((bus, WorkerWiring::new(wiring), tasks))
    }
}

#[cfg(test)]
mod tests {
    use std::{any::Any, time::SystemTime};

    use serde::Serialize;

    use super::*;
    use crate::{
        events::{Event, downcast_ref},
        workers::InputSpec,
    };

    #[derive(Serialize)]
    struct Ping {
        id: Uuid,
        n: u32,
    }

    impl Ping {
        const EVENT_TYPE: &'static str = "test.ping";

        fn new(n: u32) -> Arc<dyn Event> {
            Arc::new(Ping {
                id: Uuid::new_v4(),
                n,
            })
        }
    }

    impl Event for Ping {
        fn event_id(&self) -> Uuid {
            self.id
        }

        fn parent_ids(&self) -> &[Uuid] {
            &[]
        }

        fn event_type(&self) -> &'static str {
            Self::EVENT_TYPE
        }

        fn timestamp(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn sub(id: &'static str, queue_kind: QueueKind) -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: id,
            inputs: vec![InputSpec {
                event_type: Ping::EVENT_TYPE,
                queue_kind,
            }],
        }
    }

    fn n_of(e: &EnrichedEvent) -> u32 {
        downcast_ref::<Ping>(&e.event).unwrap().n
    }

    #[test]
    fn rejects_duplicate_subscribers_and_zero_capacity() {
        let dup = EventBusBuilder::new(BusConfig::new(Uuid::nil()))
            .subscribe(sub("a", QueueKind::FifoDropOldest { capacity: 1 }))
            .subscribe(sub("a", QueueKind::FifoDropOldest { capacity: 1 }))
            .build();
        assert!(dup.is_err());

        let zero = EventBusBuilder::new(BusConfig::new(Uuid::nil()))
            .subscribe(sub("a", QueueKind::FifoDropOldest { capacity: 0 }))
            .build();
        assert!(zero.is_err());

        let empty = EventBusBuilder::new(BusConfig::new(Uuid::nil()))
            .subscribe(SubscriptionSpec {
                subscriber_id: "a",
                inputs: vec![],
            })
            .build();
        assert!(empty.is_err());
    }

    #[tokio::test]
    async fn fans_out_in_publish_order() {
        let (bus, mut wiring, tasks) = EventBusBuilder::new(BusConfig::new(Uuid::new_v4()))
            .subscribe(sub("fifo", QueueKind::FifoDropOldest { capacity: 8 }))
            .subscribe(sub("isolated", QueueKind::Isolated { output_buffer: 8 }))
            .build()
            .unwrap();
        for t in tasks.tokio {
            tokio::spawn(t);
        }

        for n in 0..3 {
            bus.publish(Ping::new(n));
        }

        for id in ["fifo", "isolated"] {
            let mut inputs = wiring.take(id).unwrap();
            let mut seen = Vec::new();
            for _ in 0..3 {
                let item = inputs.next().await;
                assert_eq!(item.event_type, Ping::EVENT_TYPE);
                assert_eq!(item.event.run_id, bus.run_id());
                seen.push(n_of(&item.event));
            }
            assert_eq!(seen, vec![0, 1, 2]);
        }
        assert!(wiring.take("fifo").is_none());
    }

    #[tokio::test]
    async fn full_fifo_drops_oldest_and_counts_it() {
        let (bus, mut wiring, _tasks) = EventBusBuilder::new(BusConfig::new(Uuid::new_v4()))
            .subscribe(sub("slow", QueueKind::FifoDropOldest { capacity: 2 }))
            .build()
            .unwrap();

        for n in 0..3 {
            bus.publish(Ping::new(n));
        }

        let mut inputs = wiring.take("slow").unwrap();
        assert_eq!(n_of(&inputs.next().await.event), 1);
        assert_eq!(n_of(&inputs.next().await.event), 2);
        assert_eq!(bus.drops_by_subscriber().get("slow"), Some(&1));
        assert_eq!(bus.stats().dropped(), 1);
    }

    #[test]
    fn unrouted_publishes_are_counted() {
        let (bus, _wiring, _tasks) = EventBusBuilder::new(BusConfig {
            run_id: Uuid::nil(),
            strict_routing: false,
        })
        .build()
        .unwrap();

        bus.publish(Ping::new(0));
        assert_eq!(bus.stats().unrouted(), 1);
    }
}
