pub mod fifo_drop_oldest_queue;
pub mod isolated_forwarder;

pub use fifo_drop_oldest_queue::*;
pub use isolated_forwarder::*;

/// How a subscriber's inbox for one event type behaves when it fills up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Bounded ring; a push onto a full queue evicts the oldest entry.
    FifoDropOldest { capacity: usize },
    /// Publishes go through a forwarding task so a slow subscriber never
    /// holds the publisher; only a full forwarder inbox drops.
    Isolated { output_buffer: usize },
}
