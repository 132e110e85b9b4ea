//! Event pool - recycled event storage
//!
//! Pre-allocates `EventData` boxes so steady-state logging does not
//! allocate per event. When the pool runs dry a fresh box is allocated on
//! demand and joins the pool on release.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

use crate::event::{EventData, LogEvent};

pub(crate) struct PoolShared {
    queue: ArrayQueue<Box<EventData>>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl PoolShared {
    pub(crate) fn put(&self, mut data: Box<EventData>) {
        self.released.fetch_add(1, Ordering::Relaxed);
        data.reset();
        // Pool full means the box is simply dropped.
        let _ = self.queue.push(data);
    }
}

/// Shared pool of event storage
///
/// Cloneable handle; all clones share the same storage.
#[derive(Clone)]
pub struct EventPool {
    shared: Arc<PoolShared>,
}

/// Point-in-time pool counters
///
/// `acquired - released` is the number of events currently in flight;
/// tests use it to prove the release-exactly-once contract.
#[derive(Debug, Clone, Copy)]
pub struct PoolMetricsSnapshot {
    pub acquired: u64,
    pub released: u64,
}

impl PoolMetricsSnapshot {
    /// Events currently held by producers or the sink
    pub fn in_flight(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

impl EventPool {
    /// Create a pool with `capacity` pre-allocated events
    pub fn new(capacity: usize) -> Self {
        let queue = ArrayQueue::new(capacity.max(1));
        for _ in 0..capacity {
            let _ = queue.push(Box::new(EventData::blank()));
        }
        Self {
            shared: Arc::new(PoolShared {
                queue,
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
            }),
        }
    }

    /// Take a blank event from the pool
    pub fn acquire(&self) -> LogEvent {
        self.shared.acquired.fetch_add(1, Ordering::Relaxed);
        let data = self
            .shared
            .queue
            .pop()
            .unwrap_or_else(|| Box::new(EventData::blank()));
        LogEvent::new(data, Arc::clone(&self.shared))
    }

    /// Counter snapshot
    pub fn metrics(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            acquired: self.shared.acquired.load(Ordering::Relaxed),
            released: self.shared.released.load(Ordering::Relaxed),
        }
    }

    /// Number of pooled events currently available
    pub fn available(&self) -> usize {
        self.shared.queue.len()
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
