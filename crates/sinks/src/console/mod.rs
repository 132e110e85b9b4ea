//! Console handler - formatted lines on stdout

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use scribe_config::{ConsoleConfig, HandlerConfig};
use scribe_dispatch::{Handler, Result};
use scribe_event::LogEvent;

use crate::format::render_line;

/// Writes one rendered line per event to stdout
pub struct ConsoleHandler {
    config: ConsoleConfig,
}

impl ConsoleHandler {
    pub fn new(config: ConsoleConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Handler for ConsoleHandler {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn activate(&mut self) -> Result<()> {
        Ok(())
    }

    async fn deactivate(&mut self) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.flush()?;
        Ok(())
    }

    async fn handle(&mut self, event: &LogEvent) -> Result<()> {
        let line = render_line(event);
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(line.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }

    async fn on_timer(&mut self, _timer_duration: Duration) -> Result<()> {
        Ok(())
    }

    fn apply_configuration(&mut self, config: &HandlerConfig) -> Result<bool> {
        match config {
            HandlerConfig::Console(c) if c.name == self.config.name => {
                self.config = c.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
