//! Pooled log events
//!
//! A `LogEvent` owns a boxed `EventData` borrowed from an `EventPool`.
//! `release` consumes the event and returns the storage; dropping an event
//! without releasing does the same, so storage is returned exactly once.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::level::Level;
use crate::monitor::MonitorId;
use crate::pool::PoolShared;
use crate::tags::TagSet;

/// Exception detail attached to an event
#[derive(Debug, Clone, Default)]
pub struct ExceptionData {
    /// The failure message
    pub message: String,
    /// Optional captured stack or context lines
    pub detail: Option<String>,
}

/// The payload of a log event
///
/// Owned by a `LogEvent` while in flight; recycled through the pool after
/// release.
#[derive(Debug)]
pub struct EventData {
    /// Stable identity of the producing monitor
    pub monitor_id: MonitorId,
    /// UTC time of the event, strictly monotonic per monitor
    pub log_time: DateTime<Utc>,
    /// The monitor's previous event time
    pub previous_log_time: DateTime<Utc>,
    /// Severity
    pub level: Level,
    /// Named traits of the event
    pub tags: TagSet,
    /// The event text
    pub text: String,
    /// Optional exception detail
    pub exception: Option<ExceptionData>,
}

impl EventData {
    pub(crate) fn blank() -> Self {
        Self {
            monitor_id: MonitorId::UNKNOWN,
            log_time: DateTime::<Utc>::MIN_UTC,
            previous_log_time: DateTime::<Utc>::MIN_UTC,
            level: Level::Trace,
            tags: TagSet::EMPTY,
            text: String::new(),
            exception: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.monitor_id = MonitorId::UNKNOWN;
        self.log_time = DateTime::<Utc>::MIN_UTC;
        self.previous_log_time = DateTime::<Utc>::MIN_UTC;
        self.level = Level::Trace;
        self.tags = TagSet::EMPTY;
        self.text.clear();
        self.exception = None;
    }
}

/// A log event in flight between a producer and the dispatcher
///
/// Ownership transfers to the sink on successful submission and back to
/// the producer when submission fails. Whoever holds the event last calls
/// [`LogEvent::release`]; a plain drop is an implicit release.
pub struct LogEvent {
    data: Option<Box<EventData>>,
    pool: Arc<PoolShared>,
}

impl LogEvent {
    pub(crate) fn new(data: Box<EventData>, pool: Arc<PoolShared>) -> Self {
        Self {
            data: Some(data),
            pool,
        }
    }

    /// Borrow the event payload
    #[inline]
    pub fn data(&self) -> &EventData {
        // data is Some for the whole life of the event; it is only taken
        // on the release path, which consumes self.
        self.data.as_ref().expect("event already released")
    }

    /// Mutable access for the producer filling the event
    #[inline]
    pub fn data_mut(&mut self) -> &mut EventData {
        self.data.as_mut().expect("event already released")
    }

    /// Return the event's storage to its pool
    ///
    /// Consuming by value makes a double release unrepresentable.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(data) = self.data.take() {
            self.pool.put(data);
        }
    }
}

impl Drop for LogEvent {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            Some(d) => f
                .debug_struct("LogEvent")
                .field("monitor_id", &d.monitor_id)
                .field("level", &d.level)
                .field("text", &d.text)
                .finish(),
            None => f.write_str("LogEvent(released)"),
        }
    }
}
