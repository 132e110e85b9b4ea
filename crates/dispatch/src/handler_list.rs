//! The worker-owned handler list
//!
//! Only the worker touches this list. Fault handling lives here: a handler
//! that errors during `handle` or `on_timer` is deactivated and dropped
//! once the current item has been offered to every other handler.

use std::time::Duration;

use scribe_config::HandlerConfig;
use scribe_event::LogEvent;

use crate::error::Result;
use crate::handler::Handler;

/// Ordered set of active handlers
#[derive(Default)]
pub struct HandlerList {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Identities of the active handlers, in order
    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_owned()).collect()
    }

    /// Append an already-activated handler
    pub(crate) fn push(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Box<dyn Handler> {
        self.handlers.remove(index)
    }

    pub(crate) fn drain_all(&mut self) -> Vec<Box<dyn Handler>> {
        std::mem::take(&mut self.handlers)
    }

    pub(crate) fn replace(&mut self, handlers: Vec<Box<dyn Handler>>) {
        self.handlers = handlers;
    }

    pub(crate) fn apply_config_at(&mut self, index: usize, config: &HandlerConfig) -> Result<bool> {
        self.handlers[index].apply_configuration(config)
    }

    /// Offer one event to every handler, then retire the faulty ones
    pub(crate) async fn dispatch(&mut self, event: &LogEvent) {
        let mut faulty = Vec::new();
        for (index, handler) in self.handlers.iter_mut().enumerate() {
            if let Err(error) = handler.handle(event).await {
                tracing::error!(
                    handler = %handler.name(),
                    %error,
                    "handler failed while handling an event, removing it"
                );
                faulty.push(index);
            }
        }
        self.retire(faulty).await;
    }

    /// Run the periodic timer on every handler, then retire the faulty ones
    pub(crate) async fn on_timer(&mut self, timer_duration: Duration) {
        let mut faulty = Vec::new();
        for (index, handler) in self.handlers.iter_mut().enumerate() {
            if let Err(error) = handler.on_timer(timer_duration).await {
                tracing::error!(
                    handler = %handler.name(),
                    %error,
                    "handler failed in on_timer, removing it"
                );
                faulty.push(index);
            }
        }
        self.retire(faulty).await;
    }

    /// Deactivate and remove the first handler with the given identity
    pub(crate) async fn remove_by_name(&mut self, name: &str) -> bool {
        let Some(index) = self.handlers.iter().position(|h| h.name() == name) else {
            return false;
        };
        let mut handler = self.handlers.remove(index);
        if let Err(error) = handler.deactivate().await {
            tracing::warn!(handler = name, %error, "handler failed during deactivation");
        }
        true
    }

    /// Deactivate everything, emptying the list
    pub(crate) async fn deactivate_all(&mut self) {
        for mut handler in self.handlers.drain(..) {
            if let Err(error) = handler.deactivate().await {
                tracing::warn!(
                    handler = %handler.name(),
                    %error,
                    "handler failed during deactivation"
                );
            }
        }
    }

    async fn retire(&mut self, faulty: Vec<usize>) {
        for index in faulty.into_iter().rev() {
            let mut handler = self.handlers.remove(index);
            if let Err(error) = handler.deactivate().await {
                tracing::warn!(
                    handler = %handler.name(),
                    %error,
                    "faulty handler also failed during deactivation"
                );
            }
        }
    }
}
