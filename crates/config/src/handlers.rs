//! Handler configuration types
//!
//! Configuration for the output handlers the dispatcher drives. Handlers
//! are identified by type plus identity (the `path` for file handlers, the
//! `name` for the console); the reconciler matches an incoming config to a
//! live handler through that identity.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Configuration for a single handler instance
///
/// The `type` tag selects the handler factory:
/// - `text_file` -> one formatted line per event, rotated files
/// - `binary_file` -> length-prefixed binary records, rotated files
/// - `console` -> formatted lines on stdout
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerConfig {
    /// Text file handler - human-readable rotated log files
    TextFile(TextFileConfig),

    /// Binary file handler - compact rotated record files
    BinaryFile(BinaryFileConfig),

    /// Console handler - formatted lines on stdout
    Console(ConsoleConfig),
}

impl HandlerConfig {
    /// Get the handler type name (the factory registry key)
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TextFile(_) => "text_file",
            Self::BinaryFile(_) => "binary_file",
            Self::Console(_) => "console",
        }
    }

    /// The identity the reconciler matches on
    pub fn identity(&self) -> &str {
        match self {
            Self::TextFile(c) => &c.file.path,
            Self::BinaryFile(c) => &c.file.path,
            Self::Console(c) => &c.name,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::TextFile(c) => c.file.validate(),
            Self::BinaryFile(c) => c.file.validate(),
            Self::Console(_) => Ok(()),
        }
    }
}

/// Rotation, archival and housekeeping settings shared by file handlers
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileHandlerConfig {
    /// Root directory for this handler's files
    pub path: String,

    /// Entries per file before rotation
    /// Default: 20000
    pub max_count_per_file: u32,

    /// Gzip finalized files (extension is unchanged; the flag is the signal)
    pub use_gzip_compression: bool,

    /// Suffix of produced files, e.g. ".log"
    /// Empty means the handler's own default.
    pub file_name_suffix: String,

    /// Timed-folder lifecycle; absent means flat mode
    pub timed_folders: Option<TimedFolderConfig>,

    /// Maintain a "last run" symbolic link to the newest finalized file
    pub with_last_run_symlink: bool,

    /// Name of the symbolic link, relative to `path`
    /// Default: "LastRun.log"
    pub last_run_file_name: String,

    /// Periodic age/size housekeeping; absent disables it
    pub housekeeping: Option<HousekeepingConfig>,
}

impl Default for FileHandlerConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            max_count_per_file: 20_000,
            use_gzip_compression: false,
            file_name_suffix: String::new(),
            timed_folders: None,
            with_last_run_symlink: false,
            last_run_file_name: "LastRun.log".into(),
            housekeeping: None,
        }
    }
}

impl FileHandlerConfig {
    /// Whether timed-folder mode is enabled
    pub fn timed_folder_mode(&self) -> bool {
        self.timed_folders
            .as_ref()
            .is_some_and(|t| t.max_current_log_folder_count > 0)
    }

    /// Fill an empty suffix with the handler's default
    pub fn resolve_suffix(&mut self, default_suffix: &str) {
        if self.file_name_suffix.is_empty() {
            self.file_name_suffix = default_suffix.to_owned();
        }
    }

    /// Validate the file handler surface
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(ConfigError::missing_field("handler", "<file>", "path"));
        }
        if self.max_count_per_file == 0 {
            return Err(ConfigError::invalid_value(
                "handler",
                &self.path,
                "max_count_per_file",
                "must be positive",
            ));
        }
        if self.with_last_run_symlink && self.last_run_file_name.is_empty() {
            return Err(ConfigError::missing_field(
                "handler",
                &self.path,
                "last_run_file_name",
            ));
        }
        if let Some(hk) = &self.housekeeping {
            hk.validate(&self.path)?;
        }
        Ok(())
    }
}

/// Text file handler configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TextFileConfig {
    /// Rotation and housekeeping settings
    #[serde(flatten)]
    pub file: FileHandlerConfig,
}

/// Binary file handler configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BinaryFileConfig {
    /// Rotation and housekeeping settings
    #[serde(flatten)]
    pub file: FileHandlerConfig,
}

/// Console handler configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Instance name (the reconciliation identity)
    pub name: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            name: "console".into(),
        }
    }
}

/// Timed-folder lifecycle caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimedFolderConfig {
    /// Timed folders kept at the root before archival
    /// Timed-folder mode is enabled iff this is positive.
    pub max_current_log_folder_count: u32,

    /// Timed folders kept inside `Archive/`; 0 = unlimited
    pub max_archived_log_folder_count: u32,
}

impl Default for TimedFolderConfig {
    fn default() -> Self {
        Self {
            max_current_log_folder_count: 5,
            max_archived_log_folder_count: 20,
        }
    }
}

/// Age/size housekeeping settings
///
/// At least one of `min_time_to_keep_secs` and `max_total_bytes_to_keep`
/// must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    /// Files younger than this are never deleted
    pub min_time_to_keep_secs: u64,

    /// Total bytes to keep across candidates; 0 = unlimited
    pub max_total_bytes_to_keep: u64,

    /// Run housekeeping every N handler timer ticks
    /// Default: 1800 (half an hour at the default 1 s tick)
    pub run_every_ticks: u32,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            min_time_to_keep_secs: 7 * 24 * 3600,
            max_total_bytes_to_keep: 0,
            run_every_ticks: 1800,
        }
    }
}

impl HousekeepingConfig {
    /// Time-to-keep as a `Duration`
    pub fn min_time_to_keep(&self) -> Duration {
        Duration::from_secs(self.min_time_to_keep_secs)
    }

    fn validate(&self, owner: &str) -> Result<()> {
        if self.min_time_to_keep_secs == 0 && self.max_total_bytes_to_keep == 0 {
            return Err(ConfigError::invalid_value(
                "handler",
                owner,
                "housekeeping",
                "at least one of min_time_to_keep_secs and max_total_bytes_to_keep must be positive",
            ));
        }
        if self.run_every_ticks == 0 {
            return Err(ConfigError::invalid_value(
                "handler",
                owner,
                "housekeeping.run_every_ticks",
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_file(path: &str) -> HandlerConfig {
        HandlerConfig::TextFile(TextFileConfig {
            file: FileHandlerConfig {
                path: path.into(),
                ..FileHandlerConfig::default()
            },
        })
    }

    #[test]
    fn test_identity_per_kind() {
        assert_eq!(text_file("logs/app").identity(), "logs/app");
        let console = HandlerConfig::Console(ConsoleConfig::default());
        assert_eq!(console.identity(), "console");
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let cfg = text_file("");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_rotation_cap() {
        let cfg = HandlerConfig::TextFile(TextFileConfig {
            file: FileHandlerConfig {
                path: "logs".into(),
                max_count_per_file: 0,
                ..FileHandlerConfig::default()
            },
        });
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_count_per_file"));
    }

    #[test]
    fn test_validate_symlink_requires_name() {
        let cfg = HandlerConfig::TextFile(TextFileConfig {
            file: FileHandlerConfig {
                path: "logs".into(),
                with_last_run_symlink: true,
                last_run_file_name: String::new(),
                ..FileHandlerConfig::default()
            },
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_housekeeping_needs_one_positive() {
        let cfg = HandlerConfig::TextFile(TextFileConfig {
            file: FileHandlerConfig {
                path: "logs".into(),
                housekeeping: Some(HousekeepingConfig {
                    min_time_to_keep_secs: 0,
                    max_total_bytes_to_keep: 0,
                    run_every_ticks: 10,
                }),
                ..FileHandlerConfig::default()
            },
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_timed_folder_mode_follows_current_cap() {
        let mut file = FileHandlerConfig {
            path: "logs".into(),
            timed_folders: Some(TimedFolderConfig {
                max_current_log_folder_count: 0,
                max_archived_log_folder_count: 5,
            }),
            ..FileHandlerConfig::default()
        };
        assert!(!file.timed_folder_mode());
        file.timed_folders = Some(TimedFolderConfig::default());
        assert!(file.timed_folder_mode());
    }

    #[test]
    fn test_deserialize_tagged_handler() {
        let cfg: HandlerConfig = toml::from_str(
            r#"
            type = "text_file"
            path = "logs/app"
            max_count_per_file = 100
            use_gzip_compression = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.type_name(), "text_file");
        match cfg {
            HandlerConfig::TextFile(mut c) => {
                assert_eq!(c.file.path, "logs/app");
                assert_eq!(c.file.max_count_per_file, 100);
                assert!(c.file.use_gzip_compression);
                assert!(c.file.file_name_suffix.is_empty());
                c.file.resolve_suffix(".log");
                assert_eq!(c.file.file_name_suffix, ".log");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
