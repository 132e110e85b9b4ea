//! Scribe - Dispatcher sink
//!
//! The single-worker heart of the runtime: an unbounded MPSC queue fed by
//! many producers and drained by exactly one cooperative worker that owns
//! the handler list.
//!
//! # Architecture
//!
//! ```text
//! [Producers] --try_submit--> [unbounded queue] --> [Worker task]
//!                                                       |
//!                                    ┌──────────────────┼──────────────┐
//!                                [Handler]          [Handler]      [Handler]
//! ```
//!
//! Everything that mutates shared state — the handler list, file outputs,
//! the identity card — runs on the worker. Producers only enqueue: events,
//! add/remove requests, actions, barriers, and finally the close sentinel.
//! Configuration documents travel out-of-band through an atomic
//! swap-and-take slot and are applied between queue items, so every event
//! is dispatched against one coherent handler set.

mod error;
mod handler;
mod handler_list;
mod identity;
mod message;
mod panic_hook;
mod reconciler;
mod registry;
mod sink;

#[cfg(test)]
mod test_support;

pub use error::{HandlerError, Result};
pub use handler::Handler;
pub use handler_list::HandlerList;
pub use identity::IdentityCard;
pub use message::{HandlerListAction, QueueMessage};
pub use registry::{HandlerRegistry, ServiceContainer};
pub use sink::{DispatcherSink, ExternalTimer, SinkClient, SinkOptions};
