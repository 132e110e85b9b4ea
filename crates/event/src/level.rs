//! Log levels and the producer-side filter

use serde::Deserialize;

/// Severity of a log event
///
/// Ordered from least to most severe so that filters can compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Short uppercase label used by textual encoders
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Producer-side gate for event submission
///
/// The filter is advisory: producers consult it before acquiring an event,
/// the dispatcher delivers whatever actually arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelFilter {
    /// Let everything through
    All,
    /// Only events at or above this level
    Minimal(Level),
    /// Drop everything
    Off,
}

impl Default for LevelFilter {
    fn default() -> Self {
        LevelFilter::Minimal(Level::Info)
    }
}

impl LevelFilter {
    /// Whether an event at `level` passes this filter
    #[inline]
    pub fn allows(self, level: Level) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Minimal(min) => level >= min,
            LevelFilter::Off => false,
        }
    }
}
