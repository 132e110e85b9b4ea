//! The handler trait
//!
//! A handler is one output of the runtime: a rotated file, the console, or
//! anything else that consumes events. All methods run on the worker, so
//! implementations never need internal synchronization.

use std::time::Duration;

use async_trait::async_trait;
use scribe_config::HandlerConfig;
use scribe_event::LogEvent;

use crate::error::Result;

/// An output sink driven by the dispatcher worker
///
/// Lifecycle: `activate -> (handle | on_timer | apply_configuration)* ->
/// deactivate`. A handler that returns an error from any method is
/// considered faulty: the worker deactivates it (best effort) and removes
/// it from the list after the current item.
#[async_trait]
pub trait Handler: Send {
    /// The handler's identity (a path or name), used for removal and logs
    fn name(&self) -> &str;

    /// Bring the handler online; called before any `handle`
    async fn activate(&mut self) -> Result<()>;

    /// Release resources; called when the handler leaves the list
    async fn deactivate(&mut self) -> Result<()>;

    /// Consume one event
    ///
    /// The worker borrows the event across the dispatch; handlers never
    /// keep it.
    async fn handle(&mut self, event: &LogEvent) -> Result<()>;

    /// Periodic maintenance, called roughly every `timer_duration`
    async fn on_timer(&mut self, timer_duration: Duration) -> Result<()>;

    /// Try to adopt an incoming configuration
    ///
    /// Returns `Ok(true)` iff the configuration targets this handler (the
    /// reconciler's matching predicate) and has been applied. `Ok(false)`
    /// leaves the handler untouched. An error marks it compromised.
    fn apply_configuration(&mut self, config: &HandlerConfig) -> Result<bool>;
}
