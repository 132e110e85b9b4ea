//! The dispatcher sink
//!
//! One unbounded queue, one worker. Producers hold a cheap [`SinkClient`]
//! and enqueue without ever blocking; the worker applies configuration
//! batches between items, fans events out to the handler list, runs the
//! periodic timers, and drains in order on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use scribe_config::DispatchConfig;
use scribe_event::{EventPool, Level, LevelFilter, LogEvent, Monitor, MonitorRegistry, TagSet};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{HandlerError, Result};
use crate::handler::Handler;
use crate::handler_list::HandlerList;
use crate::identity::IdentityCard;
use crate::message::{HandlerListAction, QueueMessage};
use crate::panic_hook;
use crate::reconciler;
use crate::registry::{HandlerRegistry, ServiceContainer};

/// How often the startup loop polls for the first configuration batch
const CONFIG_POLL_PERIOD: Duration = Duration::from_millis(5);

/// Period of the awaker heartbeat
///
/// The awaker only guarantees the periodic-timer branch runs while the
/// queue is idle; it carries no events.
const AWAKER_PERIOD: Duration = Duration::from_millis(100);

/// An injected callback invoked from the worker on its own cadence
pub struct ExternalTimer {
    /// Time between invocations
    pub period: Duration,
    /// The callback; runs on the worker
    pub callback: Box<dyn FnMut() + Send>,
}

impl ExternalTimer {
    pub fn new(period: Duration, callback: impl FnMut() + Send + 'static) -> Self {
        Self {
            period,
            callback: Box::new(callback),
        }
    }
}

/// Construction options for [`DispatcherSink`]
pub struct SinkOptions {
    /// Handler factories for configured handler types
    pub registry: HandlerRegistry,
    /// Shared event pool
    pub pool: EventPool,
    /// Process-wide monitor registry
    pub monitors: MonitorRegistry,
    /// Optional external periodic callback
    pub external_timer: Option<ExternalTimer>,
}

impl SinkOptions {
    pub fn new(registry: HandlerRegistry, pool: EventPool, monitors: MonitorRegistry) -> Self {
        Self {
            registry,
            pool,
            monitors,
            external_timer: None,
        }
    }

    /// Attach an external periodic callback
    #[must_use]
    pub fn with_external_timer(mut self, timer: ExternalTimer) -> Self {
        self.external_timer = Some(timer);
        self
    }
}

struct Shared {
    tx: mpsc::UnboundedSender<QueueMessage>,
    /// Set once the close sentinel has been written; `try_submit` fails
    /// after this point and the worker releases late arrivals unhandled.
    completed: AtomicBool,
    stop_once: AtomicBool,
    stopping: CancellationToken,
    /// Pending configuration documents, appended by producers and drained
    /// by the worker between queue items.
    pending: ArcSwap<Vec<DispatchConfig>>,
    filter: ArcSwap<LevelFilter>,
    /// The sink's own monitor, used for the close sentinel and the
    /// identity-card broadcast.
    monitor: Monitor,
}

impl Shared {
    fn stop(&self) {
        if self.stop_once.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("dispatcher sink stopping");
        self.stopping.cancel();
        let sentinel =
            self.monitor
                .create_event(Level::Info, TagSet::EMPTY, "dispatcher sink closing");
        let _ = self.tx.send(QueueMessage::Close(sentinel));
        self.completed.store(true, Ordering::Release);
    }

    fn take_pending(&self) -> Vec<DispatchConfig> {
        if self.pending.load().is_empty() {
            return Vec::new();
        }
        let taken = self.pending.swap(Arc::new(Vec::new()));
        Arc::try_unwrap(taken).unwrap_or_else(|shared| (*shared).clone())
    }
}

/// Cheap, cloneable producer handle
#[derive(Clone)]
pub struct SinkClient {
    shared: Arc<Shared>,
}

impl SinkClient {
    /// Hand an event to the worker
    ///
    /// Ownership transfers to the sink on success. On failure — only after
    /// the writer has been completed by shutdown — the event comes back
    /// and the caller must release it.
    pub fn try_submit(&self, event: LogEvent) -> std::result::Result<(), LogEvent> {
        if self.shared.completed.load(Ordering::Acquire) {
            return Err(event);
        }
        match self.shared.tx.send(QueueMessage::Event(event)) {
            Ok(()) => Ok(()),
            Err(error) => match error.0 {
                QueueMessage::Event(event) => Err(event),
                // send returns exactly the message it was given
                _ => unreachable!(),
            },
        }
    }

    /// Enqueue a handler to activate and append
    pub fn add_handler(&self, handler: Box<dyn Handler>) -> bool {
        !self.shared.completed.load(Ordering::Acquire)
            && self.shared.tx.send(QueueMessage::AddHandler(handler)).is_ok()
    }

    /// Enqueue removal of the first handler with this identity
    pub fn remove_handler(&self, name: impl Into<String>) -> bool {
        !self.shared.completed.load(Ordering::Acquire)
            && self
                .shared
                .tx
                .send(QueueMessage::RemoveHandler(name.into()))
                .is_ok()
    }

    /// Submit an operation to run on the worker
    ///
    /// The returned receiver resolves when the worker has executed the
    /// action, or with [`HandlerError::Cancelled`] when shutdown got there
    /// first.
    pub fn run_action(
        &self,
        run: impl FnOnce(&Monitor, &HandlerList) -> Result<()> + Send + 'static,
    ) -> oneshot::Receiver<Result<()>> {
        let (action, receiver) = HandlerListAction::new(run);
        if self.shared.completed.load(Ordering::Acquire) {
            let _ = action.done.send(Err(HandlerError::Cancelled));
            return receiver;
        }
        if let Err(error) = self.shared.tx.send(QueueMessage::Action(action)) {
            if let QueueMessage::Action(action) = error.0 {
                let _ = action.done.send(Err(HandlerError::Cancelled));
            }
        }
        receiver
    }

    /// Barrier for async producers
    ///
    /// Resolves once every message enqueued before it has been dispatched.
    /// Returns false when the queue was already completed.
    pub async fn async_wait(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.shared.tx.send(QueueMessage::AsyncWait(tx)).is_err() {
            return false;
        }
        rx.await.is_ok()
    }

    /// Blocking barrier for producers outside the runtime
    ///
    /// Must not be called from the worker or from an async context.
    pub fn sync_wait(&self) -> bool {
        let (tx, rx) = std::sync::mpsc::channel();
        if self.shared.tx.send(QueueMessage::SyncWait(tx)).is_err() {
            return false;
        }
        rx.recv().is_ok()
    }

    /// Append a configuration document to the pending slot
    ///
    /// The worker drains the slot between queue items; the first document
    /// also releases the worker from its startup wait.
    pub fn apply_configuration(&self, config: DispatchConfig) {
        self.shared.pending.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(config.clone());
            next
        });
    }

    /// The current producer-side filter
    pub fn minimal_filter(&self) -> LevelFilter {
        **self.shared.filter.load()
    }

    /// Whether producers should bother submitting at this level
    pub fn should_log(&self, level: Level) -> bool {
        self.minimal_filter().allows(level)
    }

    /// Create an event stamped by the sink's own monitor
    pub fn create_event(
        &self,
        level: Level,
        tags: TagSet,
        text: impl Into<String>,
    ) -> LogEvent {
        self.shared.monitor.create_event(level, tags, text)
    }

    /// A token cancelled when shutdown begins
    pub fn stopping_token(&self) -> CancellationToken {
        self.shared.stopping.child_token()
    }

    /// Whether the queue no longer accepts submissions
    pub fn is_completed(&self) -> bool {
        self.shared.completed.load(Ordering::Acquire)
    }

    /// Begin shutdown (idempotent); see [`DispatcherSink::stop`]
    pub fn stop(&self) {
        self.shared.stop();
    }
}

/// The single-worker dispatcher
///
/// Owns the worker task. Producers interact through [`SinkClient`]s.
pub struct DispatcherSink {
    shared: Arc<Shared>,
    services: ServiceContainer,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DispatcherSink {
    /// Spawn the worker; must be called within a tokio runtime
    ///
    /// The worker idles (polling every few milliseconds) until the first
    /// configuration document arrives through
    /// [`SinkClient::apply_configuration`].
    pub fn new(options: SinkOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor_id = options.monitors.register("scribe.dispatcher");
        let shared = Arc::new(Shared {
            tx,
            completed: AtomicBool::new(false),
            stop_once: AtomicBool::new(false),
            stopping: CancellationToken::new(),
            pending: ArcSwap::from_pointee(Vec::new()),
            filter: ArcSwap::from_pointee(LevelFilter::default()),
            monitor: Monitor::new(monitor_id, options.pool.clone()),
        });
        let services = ServiceContainer::new(options.pool, options.monitors);
        let worker = Worker {
            rx,
            shared: Arc::clone(&shared),
            registry: options.registry,
            services: services.clone(),
            list: HandlerList::new(),
            timer_duration: Duration::from_millis(500),
            external: options.external_timer,
            next_tick: Instant::now(),
            next_external_tick: Instant::now(),
        };
        let handle = tokio::spawn(worker.run());
        Self {
            shared,
            services,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// The shared services handed to handler factories
    pub fn services(&self) -> &ServiceContainer {
        &self.services
    }

    /// A new producer handle
    pub fn client(&self) -> SinkClient {
        SinkClient {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Begin shutdown
    ///
    /// Idempotent: the first caller cancels the stopping token, writes the
    /// close sentinel, and completes the queue writer. Producers racing
    /// past the sentinel have their events released unhandled by the
    /// drain.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Stop and wait for the worker to finish its drain
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

struct Worker {
    rx: mpsc::UnboundedReceiver<QueueMessage>,
    shared: Arc<Shared>,
    registry: HandlerRegistry,
    services: ServiceContainer,
    list: HandlerList,
    timer_duration: Duration,
    external: Option<ExternalTimer>,
    next_tick: Instant,
    next_external_tick: Instant,
}

impl Worker {
    async fn run(mut self) {
        // Startup: nothing runs until the first configuration batch lands
        // in the pending slot (or shutdown wins the race).
        let first_batch = loop {
            let batch = self.shared.take_pending();
            if !batch.is_empty() {
                break batch;
            }
            if self.shared.stopping.is_cancelled() {
                break Vec::new();
            }
            tokio::time::sleep(CONFIG_POLL_PERIOD).await;
        };

        tracing::debug!(
            monitor = %self.shared.monitor.id(),
            "dispatcher worker starting"
        );
        for config in first_batch {
            self.apply_configuration(config).await;
        }

        self.initialize_identity_card();
        self.broadcast_identity_card().await;

        let now = Instant::now();
        self.next_tick = now + self.timer_duration;
        self.next_external_tick =
            now + self.external.as_ref().map_or(self.timer_duration, |e| e.period);

        let awaker = self.spawn_awaker();

        loop {
            let Some(message) = self.rx.recv().await else {
                break;
            };
            for config in self.shared.take_pending() {
                self.apply_configuration(config).await;
            }
            let closing = matches!(message, QueueMessage::Close(_));
            self.dispatch(message).await;
            if closing {
                break;
            }
            if !self.shared.stopping.is_cancelled() {
                self.run_periodic().await;
            }
        }

        awaker.abort();
        self.drain_remaining();
        self.list.deactivate_all().await;
        tracing::info!("dispatcher worker stopped");
    }

    fn spawn_awaker(&self) -> JoinHandle<()> {
        let tx = self.shared.tx.clone();
        let stopping = self.shared.stopping.child_token();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(AWAKER_PERIOD);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stopping.cancelled() => break,
                    _ = interval.tick() => {
                        if tx.send(QueueMessage::Tick).is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn dispatch(&mut self, message: QueueMessage) {
        match message {
            QueueMessage::Tick => {}
            QueueMessage::Event(event) => self.dispatch_event(event).await,
            QueueMessage::AddHandler(mut handler) => match handler.activate().await {
                Ok(()) => {
                    tracing::info!(handler = %handler.name(), "handler activated");
                    self.list.push(handler);
                }
                Err(error) => {
                    tracing::error!(
                        handler = %handler.name(),
                        %error,
                        "handler failed to activate, not added"
                    );
                }
            },
            QueueMessage::RemoveHandler(name) => {
                if !self.list.remove_by_name(&name).await {
                    tracing::debug!(handler = %name, "remove requested for unknown handler");
                }
            }
            QueueMessage::Action(action) => {
                let result = (action.run)(&self.shared.monitor, &self.list);
                let _ = action.done.send(result);
            }
            QueueMessage::AsyncWait(done) => {
                let _ = done.send(());
            }
            QueueMessage::SyncWait(done) => {
                let _ = done.send(());
            }
            QueueMessage::Close(event) => {
                self.list.dispatch(&event).await;
                event.release();
            }
        }
    }

    async fn dispatch_event(&mut self, event: LogEvent) {
        if event
            .data()
            .tags
            .overlaps(TagSet::identity_card_update())
        {
            let merged = match IdentityCard::parse_payload(&event.data().text) {
                Ok(entries) => self
                    .services
                    .identity()
                    .write()
                    .unwrap_or_else(|p| p.into_inner())
                    .merge(&entries),
                Err(error) => {
                    tracing::error!(%error, "unparseable identity card payload, suppressing event");
                    event.release();
                    return;
                }
            };
            if !merged {
                event.release();
                return;
            }
        }
        self.list.dispatch(&event).await;
        event.release();
    }

    async fn run_periodic(&mut self) {
        let now = Instant::now();
        if now < self.next_tick {
            return;
        }
        self.list.on_timer(self.timer_duration).await;
        self.next_tick = now + self.timer_duration;

        if now >= self.next_external_tick {
            if let Some(external) = self.external.as_mut() {
                (external.callback)();
                self.next_external_tick = now + external.period;
            }
        }
    }

    async fn apply_configuration(&mut self, config: DispatchConfig) {
        self.shared.filter.store(Arc::new(config.minimal_filter));
        self.timer_duration = config.timer_duration();
        self.next_tick = Instant::now() + self.timer_duration;
        if config.track_panics {
            panic_hook::install(SinkClient {
                shared: Arc::clone(&self.shared),
            });
        }
        reconciler::reconcile(&mut self.list, config.handlers, &self.registry, &self.services)
            .await;
        tracing::debug!(handlers = self.list.len(), "configuration applied");
    }

    fn initialize_identity_card(&self) {
        let mut card = self
            .services
            .identity()
            .write()
            .unwrap_or_else(|p| p.into_inner());
        card.set("process/id", std::process::id().to_string());
        card.set("process/os", std::env::consts::OS);
        if let Ok(exe) = std::env::current_exe() {
            if let Some(name) = exe.file_name() {
                card.set("process/name", name.to_string_lossy());
            }
        }
    }

    async fn broadcast_identity_card(&mut self) {
        let payload = self.services.identity_snapshot().to_json();
        let event = self.shared.monitor.create_event(
            Level::Info,
            TagSet::identity_card_full(),
            payload,
        );
        self.list.dispatch(&event).await;
        event.release();
    }

    fn drain_remaining(&mut self) {
        self.rx.close();
        while let Ok(message) = self.rx.try_recv() {
            match message {
                QueueMessage::Event(event) | QueueMessage::Close(event) => event.release(),
                QueueMessage::Action(action) => {
                    let _ = action.done.send(Err(HandlerError::Cancelled));
                }
                QueueMessage::AsyncWait(done) => {
                    let _ = done.send(());
                }
                QueueMessage::SyncWait(done) => {
                    let _ = done.send(());
                }
                QueueMessage::AddHandler(handler) => {
                    tracing::warn!(
                        handler = %handler.name(),
                        "handler add request dropped by shutdown"
                    );
                }
                QueueMessage::Tick | QueueMessage::RemoveHandler(_) => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod sink_test;
