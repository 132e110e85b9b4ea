//! Test doubles shared by the dispatcher tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scribe_config::HandlerConfig;
use scribe_event::LogEvent;

use crate::error::{HandlerError, Result};
use crate::handler::Handler;
use crate::registry::HandlerRegistry;

/// Observation state shared between a test and its handler instance
#[derive(Default)]
pub struct Recorder {
    pub activations: AtomicU32,
    pub deactivations: AtomicU32,
    pub timer_calls: AtomicU32,
    pub events: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn recorded(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn activation_count(&self) -> u32 {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivation_count(&self) -> u32 {
        self.deactivations.load(Ordering::SeqCst)
    }
}

/// Per-name recorder store, shared with factories
#[derive(Clone, Default)]
pub struct RecorderBook {
    recorders: Arc<Mutex<HashMap<String, Arc<Recorder>>>>,
}

impl RecorderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder(&self, name: &str) -> Arc<Recorder> {
        let mut map = self.recorders.lock().unwrap();
        Arc::clone(map.entry(name.to_owned()).or_default())
    }
}

/// A handler that records everything done to it
///
/// Matches `console` configurations by name, so tests drive it through the
/// ordinary config surface.
pub struct RecordingHandler {
    name: String,
    recorder: Arc<Recorder>,
    pub fail_handle: bool,
    pub fail_probe: bool,
}

impl RecordingHandler {
    pub fn new(name: impl Into<String>, recorder: Arc<Recorder>) -> Self {
        Self {
            name: name.into(),
            recorder,
            fail_handle: false,
            fail_probe: false,
        }
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn activate(&mut self) -> Result<()> {
        self.recorder.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn deactivate(&mut self) -> Result<()> {
        self.recorder.deactivations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle(&mut self, event: &LogEvent) -> Result<()> {
        if self.fail_handle {
            return Err(HandlerError::failed(&self.name, "induced handle failure"));
        }
        self.recorder
            .events
            .lock()
            .unwrap()
            .push(event.data().text.clone());
        Ok(())
    }

    async fn on_timer(&mut self, _timer_duration: Duration) -> Result<()> {
        self.recorder.timer_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn apply_configuration(&mut self, config: &HandlerConfig) -> Result<bool> {
        if self.fail_probe {
            return Err(HandlerError::failed(&self.name, "induced probe failure"));
        }
        match config {
            HandlerConfig::Console(c) => Ok(c.name == self.name),
            _ => Ok(false),
        }
    }
}

/// A registry whose `console` factory builds recording handlers
pub fn recording_registry(book: &RecorderBook) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    let book = book.clone();
    registry.register("console", move |config, _services| {
        let HandlerConfig::Console(c) = config else {
            return Err(HandlerError::message("console factory got a foreign config"));
        };
        let recorder = book.recorder(&c.name);
        Ok(Box::new(RecordingHandler::new(&c.name, recorder)) as Box<dyn Handler>)
    });
    registry
}

/// Convenience: a console handler config with the given name
pub fn console_config(name: &str) -> HandlerConfig {
    HandlerConfig::Console(scribe_config::ConsoleConfig { name: name.into() })
}
