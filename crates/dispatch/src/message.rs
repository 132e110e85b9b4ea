//! Queue messages
//!
//! Everything that travels from producers to the worker: events, handler
//! mutations, actions, barriers, and the close sentinel. Control messages
//! share the queue with events so they are totally ordered with respect to
//! them.

use scribe_event::{LogEvent, Monitor};
use tokio::sync::oneshot;

use crate::error::Result;
use crate::handler::Handler;
use crate::handler_list::HandlerList;

/// An operation executed on the worker against the handler list
///
/// Actions are the escape hatch for arbitrary inspections that must see a
/// coherent handler set; they receive the sink's own monitor and a shared
/// view of the list. Completion (or the shutdown cancellation) is
/// delivered through the paired receiver.
pub struct HandlerListAction {
    pub(crate) run: Box<dyn FnOnce(&Monitor, &HandlerList) -> Result<()> + Send>,
    pub(crate) done: oneshot::Sender<Result<()>>,
}

impl HandlerListAction {
    /// Package a closure and the completion channel it reports through
    pub fn new(
        run: impl FnOnce(&Monitor, &HandlerList) -> Result<()> + Send + 'static,
    ) -> (Self, oneshot::Receiver<Result<()>>) {
        let (done, receiver) = oneshot::channel();
        (
            Self {
                run: Box::new(run),
                done,
            },
            receiver,
        )
    }
}

/// One item of the dispatcher queue
pub enum QueueMessage {
    /// Awaker heartbeat; exists only to re-enter the periodic-timer branch
    Tick,

    /// A producer event to fan out
    Event(LogEvent),

    /// Activate and append a handler
    AddHandler(Box<dyn Handler>),

    /// Deactivate and remove the first handler with this identity
    RemoveHandler(String),

    /// Run an operation on the worker
    Action(HandlerListAction),

    /// Async barrier: completed when the worker reaches it
    AsyncWait(oneshot::Sender<()>),

    /// Sync barrier: signalled when the worker reaches it
    SyncWait(std::sync::mpsc::Sender<()>),

    /// The close sentinel: dispatched like an event, then the loop ends
    Close(LogEvent),
}

impl std::fmt::Debug for QueueMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueMessage::Tick => f.write_str("Tick"),
            QueueMessage::Event(e) => f.debug_tuple("Event").field(e).finish(),
            QueueMessage::AddHandler(h) => f.debug_tuple("AddHandler").field(&h.name()).finish(),
            QueueMessage::RemoveHandler(name) => {
                f.debug_tuple("RemoveHandler").field(name).finish()
            }
            QueueMessage::Action(_) => f.write_str("Action"),
            QueueMessage::AsyncWait(_) => f.write_str("AsyncWait"),
            QueueMessage::SyncWait(_) => f.write_str("SyncWait"),
            QueueMessage::Close(e) => f.debug_tuple("Close").field(e).finish(),
        }
    }
}
