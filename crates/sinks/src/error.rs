//! Sink error types

use std::io;

use scribe_dispatch::HandlerError;
use thiserror::Error;

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors from file handlers and the rotation engine
#[derive(Debug, Error)]
pub enum SinkError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A caller passed an unusable value
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation ran before `initialize` succeeded
    #[error("file output is not initialized")]
    NotInitialized,

    /// `initialize` could not resolve or create the root path
    #[error("could not initialize file output under '{path}'")]
    InitializeFailed {
        /// The configured root
        path: String,
    },
}

impl SinkError {
    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<SinkError> for HandlerError {
    fn from(error: SinkError) -> Self {
        match error {
            SinkError::Io(source) => HandlerError::Io(source),
            other => HandlerError::Message(other.to_string()),
        }
    }
}
