//! Top-level dispatcher configuration

use std::path::Path;
use std::time::Duration;

use scribe_event::LevelFilter;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::handlers::HandlerConfig;

/// One complete configuration document for the dispatcher
///
/// Successive documents are reconciled against the live handler set:
/// a handler whose configuration is unchanged keeps running, handlers no
/// document claims are deactivated, unclaimed configs become new handlers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Producer-side minimal filter
    pub minimal_filter: LevelFilter,

    /// Period of the handlers' `on_timer` fan-out, in milliseconds
    /// Default: 500
    pub timer_duration_ms: u64,

    /// Install a panic hook that logs unhandled panics as fatal events
    pub track_panics: bool,

    /// Ordered handler configurations
    pub handlers: Vec<HandlerConfig>,
}

impl DispatchConfig {
    /// Timer period as a `Duration`
    ///
    /// A zero configuration falls back to the 500 ms default.
    pub fn timer_duration(&self) -> Duration {
        match self.timer_duration_ms {
            0 => Duration::from_millis(500),
            ms => Duration::from_millis(ms),
        }
    }

    /// Load a configuration document from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the document and every handler entry
    pub fn validate(&self) -> Result<()> {
        for handler in &self.handlers {
            handler.validate()?;
        }
        Ok(())
    }
}
