//! Scribe - Configuration
//!
//! Deserializable configuration for the dispatcher and its handlers.
//!
//! A configuration document is a `DispatchConfig`: the top-level filter,
//! the periodic-timer duration, and an ordered list of handler
//! configurations. The dispatcher reconciles successive documents against
//! the live handler set, so a handler whose configuration is unchanged
//! keeps running without interruption.
//!
//! # Example
//!
//! ```toml
//! minimal_filter = { minimal = "info" }
//! timer_duration_ms = 500
//!
//! [[handlers]]
//! type = "text_file"
//! path = "logs/app"
//! max_count_per_file = 20000
//!
//! [[handlers]]
//! type = "console"
//! ```

mod dispatch;
mod error;
mod handlers;

pub use dispatch::DispatchConfig;
pub use error::{ConfigError, Result};
pub use handlers::{
    BinaryFileConfig, ConsoleConfig, FileHandlerConfig, HandlerConfig, HousekeepingConfig,
    TextFileConfig, TimedFolderConfig,
};
