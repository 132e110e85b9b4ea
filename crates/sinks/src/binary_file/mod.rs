//! Binary file handler - compact rotated record files
//!
//! Length-prefixed records through the same rotation engine as the text
//! handler. The record layout is self-contained: a u32 length, then the
//! fixed header fields, then the variable text and exception sections.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use scribe_config::{BinaryFileConfig, HandlerConfig};
use scribe_dispatch::{Handler, HandlerError, Result};
use scribe_event::LogEvent;

use crate::error::SinkError;
use crate::util::{FileOutput, FileOutputOptions, FileOutputUpdate};

/// Rotated, optionally gzipped binary record files
pub struct BinaryFileHandler {
    config: BinaryFileConfig,
    output: FileOutput,
    ticks_since_housekeeping: u32,
    scratch: Vec<u8>,
}

/// Default suffix of produced record files
const DEFAULT_SUFFIX: &str = ".bin";

impl BinaryFileHandler {
    /// Create the handler; fails synchronously on an unusable config
    pub fn new(mut config: BinaryFileConfig) -> std::result::Result<Self, SinkError> {
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
            scratch: Vec::with_capacity(256),
        })
    }
}

/// Serialize one event into `out` as a length-prefixed record
fn encode_record(event: &LogEvent, out: &mut Vec<u8>) {
    let data = event.data();
    out.clear();
    // Placeholder for the length prefix.
    out.extend_from_slice(&[0u8; 4]);

    out.push(data.level as u8);
    out.extend_from_slice(&data.log_time.timestamp_millis().to_le_bytes());
    out.extend_from_slice(&data.previous_log_time.timestamp_millis().to_le_bytes());
    out.extend_from_slice(&data.tags.bits().to_le_bytes());
    out.extend_from_slice(&data.monitor_id.as_u64().to_le_bytes());

    out.extend_from_slice(&(data.text.len() as u32).to_le_bytes());
    out.extend_from_slice(data.text.as_bytes());

    match &data.exception {
        Some(exception) => {
            out.push(1);
            out.extend_from_slice(&(exception.message.len() as u32).to_le_bytes());
            out.extend_from_slice(exception.message.as_bytes());
            let detail = exception.detail.as_deref().unwrap_or("");
            out.extend_from_slice(&(detail.len() as u32).to_le_bytes());
            out.extend_from_slice(detail.as_bytes());
        }
        None => out.push(0),
    }

    let payload_len = (out.len() - 4) as u32;
    out[..4].copy_from_slice(&payload_len.to_le_bytes());
}

#[async_trait]
impl Handler for BinaryFileHandler {
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
        encode_record(event, &mut self.scratch);
        let record = &self.scratch;
        self.output.write_with(|writer| writer.write_all(record))?;
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
            HandlerConfig::BinaryFile(c) if c.file.path == self.config.file.path => {
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
