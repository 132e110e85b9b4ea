//! Scribe - Output handlers
//!
//! The handlers the dispatcher drives and the rotating file engine they
//! share.
//!
//! # Architecture
//!
//! ```text
//! [DispatcherSink] --event--> [TextFileHandler]   --line-->  [FileOutput]
//!                         └--> [BinaryFileHandler] --record-->    |
//!                         └--> [ConsoleHandler]                rotation,
//!                                                          gzip finalize,
//!                                                       timed folders,
//!                                                        housekeeping
//! ```
//!
//! File handlers delegate all on-disk lifecycle to [`util::FileOutput`]:
//! exclusive temp files, rename-or-gzip finalization, timed-folder
//! archival, age/size housekeeping, and the last-run symlink. Handlers
//! only encode events; the engine never looks inside them.

pub mod binary_file;
pub mod console;
pub mod util;

/// Text file handler - human-readable rotated log files
pub mod text_file;

mod error;
mod format;

pub use binary_file::BinaryFileHandler;
pub use console::ConsoleHandler;
pub use error::{Result, SinkError};
pub use format::render_line;
pub use text_file::TextFileHandler;

use scribe_config::HandlerConfig;
use scribe_dispatch::{Handler, HandlerError, HandlerRegistry};

/// Register the factories for the built-in handler types
///
/// Binds `text_file`, `binary_file`, and `console` in the given registry;
/// the dispatcher instantiates handlers for unclaimed configurations
/// through these.
pub fn register_default_handlers(registry: &mut HandlerRegistry) {
    registry.register("text_file", |config, _services| match config {
        HandlerConfig::TextFile(c) => {
            Ok(Box::new(TextFileHandler::new(c.clone())?) as Box<dyn Handler>)
        }
        _ => Err(HandlerError::message("text_file factory got a foreign config")),
    });
    registry.register("binary_file", |config, _services| match config {
        HandlerConfig::BinaryFile(c) => {
            Ok(Box::new(BinaryFileHandler::new(c.clone())?) as Box<dyn Handler>)
        }
        _ => Err(HandlerError::message(
            "binary_file factory got a foreign config",
        )),
    });
    registry.register("console", |config, _services| match config {
        HandlerConfig::Console(c) => Ok(Box::new(ConsoleHandler::new(c.clone())) as Box<dyn Handler>),
        _ => Err(HandlerError::message("console factory got a foreign config")),
    });
}
