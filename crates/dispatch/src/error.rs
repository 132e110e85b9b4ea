//! Dispatcher and handler error types

use thiserror::Error;

/// Result type for handler operations
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Errors surfaced by handlers and handler-list operations
///
/// Any error returned from a handler lifecycle method marks the handler
/// faulty; the worker deactivates and removes it after the current item.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A handler operation failed
    #[error("handler '{name}' failed: {message}")]
    Failed {
        /// Handler identity
        name: String,
        /// What went wrong
        message: String,
    },

    /// No factory is registered for a configured handler type
    #[error("no factory registered for handler type '{0}'")]
    UnknownHandlerType(String),

    /// The operation was cancelled by shutdown
    #[error("cancelled by shutdown")]
    Cancelled,

    /// Free-form failure
    #[error("{0}")]
    Message(String),
}

impl HandlerError {
    /// Create a named handler failure
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a free-form failure
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}
