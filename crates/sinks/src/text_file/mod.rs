//! Text file handler - human-readable rotated log files
//!
//! One escaped line per event through the shared rotation engine. The
//! timed-folder caps are enforced eagerly at activation; age/size
//! housekeeping runs from the periodic timer at the configured cadence.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use scribe_config::{HandlerConfig, TextFileConfig};
use scribe_dispatch::{Handler, HandlerError, Result};
use scribe_event::LogEvent;

use crate::error::SinkError;
use crate::format::render_line;
use crate::util::{FileOutput, FileOutputOptions, FileOutputUpdate};

/// Default suffix of produced text files
const DEFAULT_SUFFIX: &str = ".log";

/// Rotated, optionally gzipped text log files
pub struct TextFileHandler {
    config: TextFileConfig,
    output: FileOutput,
    ticks_since_housekeeping: u32,
}

impl TextFileHandler {
    /// Create the handler; fails synchronously on an unusable config
    pub fn new(mut config: TextFileConfig) -> std::result::Result<Self, SinkError> {
        config.file.resolve_suffix(DEFAULT_SUFFIX);
        config
            .file
            .validate()
            .map_err(|error| SinkError::invalid_argument(error.to_string()))?;
        let output = FileOutput::new(FileOutputOptions::from(&config.file))?;
        Ok(Self {
            config,
            output,
            ticks_since_housekeeping: 0,
        })
    }

    /// The underlying rotation engine, for inspection
    pub fn output(&self) -> &FileOutput {
        &self.output
    }
}

#[async_trait]
impl Handler for TextFileHandler {
    fn name(&self) -> &str {
        &self.config.file.path
    }

    async fn activate(&mut self) -> Result<()> {
        if !self.output.initialize(Path::new(&self.config.file.path)) {
            return Err(HandlerError::failed(
                &self.config.file.path,
                "could not initialize the file output",
            ));
        }
        // Timed-folder caps are enforced at lifecycle boundaries only.
        if let Some(timed) = &self.config.file.timed_folders {
            self.output.run_timed_folder_cleanup(timed).await;
        }
        self.ticks_since_housekeeping = 0;
        Ok(())
    }

    async fn deactivate(&mut self) -> Result<()> {
        self.output.deactivate();
        Ok(())
    }

    async fn handle(&mut self, event: &LogEvent) -> Result<()> {
        let line = render_line(event);
        self.output.write_with(|writer| {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")
        })?;
        Ok(())
    }

    async fn on_timer(&mut self, _timer_duration: Duration) -> Result<()> {
        let Some(housekeeping) = self.config.file.housekeeping else {
            return Ok(());
        };
        self.ticks_since_housekeeping += 1;
        if self.ticks_since_housekeeping < housekeeping.run_every_ticks {
            return Ok(());
        }
        self.ticks_since_housekeeping = 0;
        self.output.run_file_housekeeping(
            housekeeping.min_time_to_keep(),
            housekeeping.max_total_bytes_to_keep,
        )?;
        Ok(())
    }

    fn apply_configuration(&mut self, config: &HandlerConfig) -> Result<bool> {
        match config {
            HandlerConfig::TextFile(c) if c.file.path == self.config.file.path => {
                let mut incoming = c.clone();
                incoming.file.resolve_suffix(DEFAULT_SUFFIX);
                self.output
                    .reconfigure(FileOutputUpdate::from(&incoming.file));
                self.config = incoming;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
