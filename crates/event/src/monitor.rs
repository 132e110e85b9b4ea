//! Monitor identities and monotonic event stamping
//!
//! A `Monitor` is the producer-side facade that originates events. The
//! registry hands out stable `MonitorId`s by name; the stamper guarantees
//! the per-monitor strict monotonicity of `log_time` that downstream
//! consumers rely on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::event::{ExceptionData, LogEvent};
use crate::level::Level;
use crate::pool::EventPool;
use crate::tags::TagSet;

/// Stable identifier of an event producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorId(u64);

impl MonitorId {
    /// Identity of events whose producer is not known
    pub const UNKNOWN: MonitorId = MonitorId(0);

    /// Raw value, for encoders
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MonitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Process-wide name -> id registry for monitors
///
/// Registering the same name twice returns the same id.
#[derive(Clone, Default)]
pub struct MonitorRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    ids: HashMap<String, MonitorId>,
    names: Vec<String>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a monitor name, returning its stable id
    pub fn register(&self, name: &str) -> MonitorId {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(&id) = inner.ids.get(name) {
            return id;
        }
        inner.names.push(name.to_owned());
        let id = MonitorId(inner.names.len() as u64);
        inner.ids.insert(name.to_owned(), id);
        id
    }

    /// Look up the name behind an id
    pub fn name_of(&self, id: MonitorId) -> Option<String> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let index = id.0.checked_sub(1)? as usize;
        inner.names.get(index).cloned()
    }
}

/// Strictly increasing `(previous, next)` UTC stamp generator
///
/// A small critical section: when the wall clock stalls or steps back, the
/// next stamp is the previous one plus one millisecond.
#[derive(Default)]
pub struct EventStamper {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl EventStamper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next stamp pair
    ///
    /// Returns `(previous, next)` where `next` is strictly greater than
    /// every stamp this stamper has handed out before.
    pub fn next(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let prev = last.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut next = Utc::now();
        if next <= prev {
            next = prev + ChronoDuration::milliseconds(1);
        }
        *last = Some(next);
        (prev, next)
    }
}

/// Producer-side facade that creates stamped events
///
/// Each monitor owns its stamper, so `log_time` is strictly monotonic per
/// monitor regardless of how producers interleave.
pub struct Monitor {
    id: MonitorId,
    pool: EventPool,
    stamper: EventStamper,
}

impl Monitor {
    /// Create a monitor over a registered id
    pub fn new(id: MonitorId, pool: EventPool) -> Self {
        Self {
            id,
            pool,
            stamper: EventStamper::new(),
        }
    }

    /// The monitor's identity
    #[inline]
    pub fn id(&self) -> MonitorId {
        self.id
    }

    /// Acquire and fill a stamped event
    pub fn create_event(&self, level: Level, tags: TagSet, text: impl Into<String>) -> LogEvent {
        self.create_event_with(level, tags, text, None)
    }

    /// Acquire and fill a stamped event carrying exception detail
    pub fn create_event_with(
        &self,
        level: Level,
        tags: TagSet,
        text: impl Into<String>,
        exception: Option<ExceptionData>,
    ) -> LogEvent {
        let (prev, next) = self.stamper.next();
        let mut event = self.pool.acquire();
        {
            let data = event.data_mut();
            data.monitor_id = self.id;
            data.previous_log_time = prev;
            data.log_time = next;
            data.level = level;
            data.tags = tags;
            data.text = text.into();
            data.exception = exception;
        }
        event
    }
}

#[cfg(test)]
#[path = "monitor_test.rs"]
mod monitor_test;
