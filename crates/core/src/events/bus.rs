use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    events::{BusConfig, BusStats, EnrichedEvent, Event},
    routes::Routes,
};

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    run_id: Uuid,
    next_ingest_seq: AtomicU64,
    routes: Routes,
    stats: Arc<BusStats>,
    strict_routing: bool,
}

impl EventBus {
    pub fn new(cfg: BusConfig, routes: Routes, stats: Arc<BusStats>) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                run_id: cfg.run_id,
                next_ingest_seq: AtomicU64::new(0),
                routes,
                stats,
                strict_routing: cfg.strict_routing,
            }),
        }
    }

    /// Deliver `event` to every subscriber of its type. Never blocks.
    pub fn publish(&self, event: Arc<dyn Event>) {
        let ingest_seq = self.inner.next_ingest_seq.fetch_add(1, Ordering::Relaxed);
        let event_type = event.event_type();

        let enriched_event = Arc::new(EnrichedEvent {
            event,
            run_id: self.inner.run_id,
            ingest_seq,
            ingested_at: Instant::now(),
        });

        let Some(routes) = self.inner.routes.table.get(event_type) else {
            self.inner.stats.record_unrouted();
            if self.inner.strict_routing {
                error!(event_type, "Published event has no subscribers");
            } else {
                debug!(event_type, "Published event has no subscribers");
            }
            return;
        };

        for route in routes {
            if !route.inbox.try_deliver(Arc::clone(&enriched_event)) {
                route.drops_total.fetch_add(1, Ordering::Relaxed);
                self.inner.stats.record_drop();
                warn!(
                    event_type,
                    subscriber = route.subscriber_id,
                    "Subscriber inbox full, event dropped"
                );
            }
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    pub fn stats(&self) -> &BusStats {
        &self.inner.stats
    }

    /// Subscribers that lost events so far, with how many each lost.
    pub fn drops_by_subscriber(&self) -> BTreeMap<&'static str, u64> {
        let mut drops = BTreeMap::new();
        for route in self.inner.routes.table.values().flatten() {
            let lost = route.drops_total.load(Ordering::Relaxed);
            if lost > 0 {
                *drops.entry(route.subscriber_id).or_insert(0) += lost;
            }
        }
        drops
    }
}
