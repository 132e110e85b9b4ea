//! The rotation state machine
//!
//! A `FileOutput` owns at most one open file at a time. Entries go into an
//! exclusively-created `T-{token}{suffix}.tmp` file; after
//! `max_count_per_file` entries (or an explicit close) the temp file is
//! finalized — renamed to `{token}{suffix}`, or streamed through gzip into
//! a fresh unique file. An untouched or forgotten temp file is deleted
//! instead, so readers only ever see complete files under final names.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use scribe_config::{FileHandlerConfig, TimedFolderConfig};

use super::housekeeping::{self, HousekeepingReport};
use super::symlink;
use super::timed_folders;
use super::unique_name::{self, next_unique_name};
use crate::error::{Result, SinkError};

/// Buffer used when streaming a temp file through gzip
const GZIP_COPY_BUFFER: usize = 64 * 1024;

/// Attempts for the timed-folder cleanup before giving up
const CLEANUP_RETRY_COUNT: u32 = 5;

/// Static shape of a file output
#[derive(Debug, Clone)]
pub struct FileOutputOptions {
    /// Suffix of every produced file, e.g. ".log"
    pub file_name_suffix: String,
    /// Entries per file before rotation
    pub max_count_per_file: u32,
    /// Stream finalized files through gzip (extension unchanged)
    pub use_gzip: bool,
    /// Write into a per-lifetime timed subfolder instead of the root
    pub timed_folder_mode: bool,
    /// Maintain the last-run symlink
    pub with_last_run_symlink: bool,
    /// Symlink name, relative to the root
    pub last_run_file_name: String,
}

impl FileOutputOptions {
    fn validate(&self) -> Result<()> {
        if self.file_name_suffix.is_empty() {
            return Err(SinkError::invalid_argument("file name suffix is empty"));
        }
        if self.max_count_per_file == 0 {
            return Err(SinkError::invalid_argument(
                "max_count_per_file must be positive",
            ));
        }
        if self.with_last_run_symlink && self.last_run_file_name.is_empty() {
            return Err(SinkError::invalid_argument(
                "with_last_run_symlink requires last_run_file_name",
            ));
        }
        Ok(())
    }
}

impl From<&FileHandlerConfig> for FileOutputOptions {
    fn from(config: &FileHandlerConfig) -> Self {
        Self {
            file_name_suffix: config.file_name_suffix.clone(),
            max_count_per_file: config.max_count_per_file,
            use_gzip: config.use_gzip_compression,
            timed_folder_mode: config.timed_folder_mode(),
            with_last_run_symlink: config.with_last_run_symlink,
            last_run_file_name: config.last_run_file_name.clone(),
        }
    }
}

/// A live reconfiguration of a file output
///
/// `None` fields keep their current value. Changing the suffix, gzip flag,
/// or timed-folder mode closes the current file first; reducing
/// `max_count_per_file` below what the open file already holds does too.
#[derive(Debug, Clone, Default)]
pub struct FileOutputUpdate {
    pub file_name_suffix: Option<String>,
    pub max_count_per_file: Option<u32>,
    pub use_gzip: Option<bool>,
    pub timed_folder_mode: Option<bool>,
    pub with_last_run_symlink: Option<bool>,
    pub last_run_file_name: Option<String>,
}

impl From<&FileHandlerConfig> for FileOutputUpdate {
    fn from(config: &FileHandlerConfig) -> Self {
        Self {
            file_name_suffix: Some(config.file_name_suffix.clone()),
            max_count_per_file: Some(config.max_count_per_file),
            use_gzip: Some(config.use_gzip_compression),
            timed_folder_mode: Some(config.timed_folder_mode()),
            with_last_run_symlink: Some(config.with_last_run_symlink),
            last_run_file_name: Some(config.last_run_file_name.clone()),
        }
    }
}

/// The rotation engine behind every file handler
pub struct FileOutput {
    options: FileOutputOptions,
    /// The path `initialize` was given, kept for re-initialization
    configured_path: Option<PathBuf>,
    /// Resolved once; immutable after the first successful initialize
    root_path: Option<PathBuf>,
    /// Where files land: the root in flat mode, a timed subfolder otherwise.
    /// Cleared by `deactivate`.
    base_path: Option<PathBuf>,
    /// Chosen timed-folder name, reused on re-initialize while it exists
    timed_folder: Option<String>,
    output: Option<BufWriter<File>>,
    current_temp_path: Option<PathBuf>,
    /// Token naming both the temp file and its finalized form
    opened_time: Option<String>,
    count_remainder: u32,
    last_run_file_path: Option<PathBuf>,
}

impl FileOutput {
    /// Create an engine; fails synchronously on unusable options
    pub fn new(options: FileOutputOptions) -> Result<Self> {
        options.validate()?;
        let count_remainder = options.max_count_per_file;
        Ok(Self {
            options,
            configured_path: None,
            root_path: None,
            base_path: None,
            timed_folder: None,
            output: None,
            current_temp_path: None,
            opened_time: None,
            count_remainder,
            last_run_file_path: None,
        })
    }

    /// Resolve the root and choose the base path
    ///
    /// Returns false (with a log) when the root cannot be resolved. The
    /// root is computed once; later calls reuse it. In timed mode the
    /// previously chosen timed folder is kept while it still exists.
    pub fn initialize(&mut self, configured: &Path) -> bool {
        let root = match &self.root_path {
            Some(root) => root.clone(),
            None => match resolve_root(configured) {
                Ok(root) => root,
                Err(error) => {
                    tracing::error!(
                        path = %configured.display(),
                        %error,
                        "could not resolve the log root"
                    );
                    return false;
                }
            },
        };
        self.configured_path = Some(configured.to_path_buf());

        let base = if self.options.timed_folder_mode {
            let name = match &self.timed_folder {
                Some(name) if root.join(name).is_dir() => name.clone(),
                _ => next_unique_name(Utc::now()),
            };
            let base = root.join(&name);
            self.timed_folder = Some(name);
            base
        } else {
            root.clone()
        };

        self.root_path = Some(root);
        self.base_path = Some(base);
        self.count_remainder = self.options.max_count_per_file;
        true
    }

    /// Whether `initialize` has succeeded and `deactivate` has not run
    pub fn is_active(&self) -> bool {
        self.base_path.is_some()
    }

    /// The resolved root, once initialized
    pub fn root_path(&self) -> Option<&Path> {
        self.root_path.as_deref()
    }

    /// The current base path, while active
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// Write one entry through the injected encoder
    ///
    /// Opens a fresh temp file when none is open, lets `encode` serialize
    /// the entry, and rotates once `max_count_per_file` entries are in.
    /// Creation failures propagate as fatal write errors; the next call
    /// starts a new rotation from scratch.
    pub fn write_with<F>(&mut self, encode: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let base = self.base_path.clone().ok_or(SinkError::NotInitialized)?;
        if self.output.is_none() {
            self.open_new_file(&base)?;
        }
        if let Some(writer) = self.output.as_mut() {
            encode(writer)?;
        }
        self.count_remainder -= 1;
        if self.count_remainder == 0 {
            self.close(false);
        }
        Ok(())
    }

    fn open_new_file(&mut self, base: &Path) -> Result<()> {
        // Timed folders come into existence on the first write after
        // initialize, not before.
        fs::create_dir_all(base)?;
        let token = next_unique_name(Utc::now());
        let (file, path) = unique_name::create_exclusive(
            base,
            &format!("T-{token}"),
            &format!("{}.tmp", self.options.file_name_suffix),
        )?;
        self.output = Some(BufWriter::new(file));
        self.current_temp_path = Some(path);
        self.opened_time = Some(token);
        self.count_remainder = self.options.max_count_per_file;
        Ok(())
    }

    /// Close and finalize the current file, if any
    ///
    /// A forgotten or untouched file is deleted instead of finalized.
    /// Returns the finalized path when a file was produced.
    pub fn close(&mut self, forget: bool) -> Option<PathBuf> {
        let writer = self.output.take()?;
        let temp_path = self.current_temp_path.take()?;
        let token = self.opened_time.take()?;
        let untouched = self.count_remainder == self.options.max_count_per_file;
        self.count_remainder = self.options.max_count_per_file;

        match writer.into_inner() {
            Ok(file) => drop(file),
            Err(error) => {
                tracing::error!(
                    path = %temp_path.display(),
                    error = %error.error(),
                    "flush failed while closing the log file"
                );
            }
        }

        if forget || untouched {
            if let Err(error) = fs::remove_file(&temp_path) {
                tracing::debug!(
                    path = %temp_path.display(),
                    %error,
                    "could not delete the discarded temp file"
                );
            }
            return None;
        }

        let base = self.base_path.clone()?;
        let finalized = if self.options.use_gzip {
            match finalize_gzip(&temp_path, &base, &token, &self.options.file_name_suffix) {
                Ok(path) => path,
                Err(error) => {
                    tracing::error!(
                        path = %temp_path.display(),
                        %error,
                        "gzip finalization failed, keeping the temp file"
                    );
                    return None;
                }
            }
        } else {
            match finalize_rename(&temp_path, &base, &token, &self.options.file_name_suffix) {
                Ok(path) => path,
                Err(error) => {
                    tracing::error!(
                        path = %temp_path.display(),
                        %error,
                        "could not finalize the log file"
                    );
                    return None;
                }
            }
        };

        if self.options.with_last_run_symlink {
            if let Some(root) = &self.root_path {
                let link = root.join(&self.options.last_run_file_name);
                symlink::refresh_last_run(&link, &finalized, self.last_run_file_path.as_deref());
                self.last_run_file_path = Some(link);
            }
        }

        Some(finalized)
    }

    /// Apply a live reconfiguration
    pub fn reconfigure(&mut self, update: FileOutputUpdate) {
        let suffix_changes = update
            .file_name_suffix
            .as_ref()
            .is_some_and(|s| !s.is_empty() && *s != self.options.file_name_suffix);
        let gzip_changes = update.use_gzip.is_some_and(|g| g != self.options.use_gzip);
        let timed_changes = update
            .timed_folder_mode
            .is_some_and(|t| t != self.options.timed_folder_mode);
        if suffix_changes || gzip_changes || timed_changes {
            self.close(false);
        }

        if let Some(new_max) = update.max_count_per_file {
            if new_max > 0 && new_max != self.options.max_count_per_file {
                let written = self.options.max_count_per_file - self.count_remainder;
                // A file already at or past the new cap rotates now.
                if self.output.is_some() && new_max <= written {
                    self.close(false);
                }
                self.options.max_count_per_file = new_max;
                self.count_remainder = if self.output.is_some() {
                    new_max - written
                } else {
                    new_max
                };
            }
        }

        if let Some(suffix) = update.file_name_suffix {
            if !suffix.is_empty() {
                self.options.file_name_suffix = suffix;
            }
        }
        if let Some(gzip) = update.use_gzip {
            self.options.use_gzip = gzip;
        }
        if let Some(enabled) = update.with_last_run_symlink {
            if !enabled && self.options.with_last_run_symlink {
                let link = self.last_run_file_path.take().or_else(|| {
                    self.root_path
                        .as_ref()
                        .map(|root| root.join(&self.options.last_run_file_name))
                });
                if let Some(link) = link {
                    symlink::remove_link(&link);
                }
            }
            self.options.with_last_run_symlink = enabled;
        }
        if let Some(name) = update.last_run_file_name {
            if !name.is_empty() {
                self.options.last_run_file_name = name;
            }
        }

        if let Some(timed) = update.timed_folder_mode {
            if timed != self.options.timed_folder_mode {
                self.options.timed_folder_mode = timed;
                if self.base_path.is_some() {
                    if let Some(configured) = self.configured_path.clone() {
                        self.initialize(&configured);
                    }
                }
            }
        }
    }

    /// Close the current file and release the base path
    ///
    /// The root and the chosen timed folder survive for a later
    /// re-initialize on this same engine.
    pub fn deactivate(&mut self) {
        self.close(false);
        self.base_path = None;
    }

    /// Enforce the timed-folder caps under the root
    ///
    /// Retries up to five times with a linear backoff on I/O failure.
    /// Returns whether the caps hold.
    pub async fn run_timed_folder_cleanup(&self, config: &TimedFolderConfig) -> bool {
        let Some(root) = &self.root_path else {
            return false;
        };
        for attempt in 1..=CLEANUP_RETRY_COUNT {
            match timed_folders::enforce(root, self.base_path.as_deref(), config) {
                Ok(()) => return true,
                Err(error) => {
                    tracing::warn!(attempt, %error, "timed folder cleanup failed");
                    if attempt < CLEANUP_RETRY_COUNT {
                        tokio::time::sleep(Duration::from_millis(100) * attempt).await;
                    }
                }
            }
        }
        tracing::error!(
            attempts = CLEANUP_RETRY_COUNT,
            "timed folder cleanup gave up"
        );
        false
    }

    /// Enforce age and total-size caps over this output's files
    ///
    /// At least one of `min_age` and `max_total_bytes` must be positive.
    /// Files younger than `min_age` are never deleted; beyond the size cap
    /// the oldest deletable files go first. Per-file delete failures are
    /// warnings, not errors.
    pub fn run_file_housekeeping(
        &self,
        min_age: Duration,
        max_total_bytes: u64,
    ) -> Result<HousekeepingReport> {
        if min_age.is_zero() && max_total_bytes == 0 {
            return Err(SinkError::invalid_argument(
                "housekeeping needs a positive min_age or max_total_bytes",
            ));
        }
        let root = self.root_path.as_deref().ok_or(SinkError::NotInitialized)?;
        Ok(housekeeping::run(
            root,
            &self.options.file_name_suffix,
            self.current_temp_path.as_deref(),
            min_age,
            max_total_bytes,
            Utc::now(),
        ))
    }
}

fn resolve_root(configured: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(configured)?;
    configured.canonicalize()
}

fn finalize_rename(temp: &Path, base: &Path, token: &str, suffix: &str) -> io::Result<PathBuf> {
    let mut attempt: u32 = 0;
    loop {
        let name = if attempt == 0 {
            format!("{token}{suffix}")
        } else {
            format!("{token}({attempt}){suffix}")
        };
        let target = base.join(name);
        if target.exists() {
            attempt += 1;
            continue;
        }
        fs::rename(temp, &target)?;
        return Ok(target);
    }
}

fn finalize_gzip(temp: &Path, base: &Path, token: &str, suffix: &str) -> io::Result<PathBuf> {
    let (target_file, target_path) = unique_name::create_exclusive(base, token, suffix)?;

    let compress = || -> io::Result<()> {
        let mut source = File::open(temp)?;
        let mut encoder = GzEncoder::new(BufWriter::new(target_file), Compression::default());
        let mut buffer = vec![0u8; GZIP_COPY_BUFFER];
        loop {
            let read = source.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            encoder.write_all(&buffer[..read])?;
        }
        encoder.finish()?.flush()
    };

    match compress() {
        Ok(()) => {
            if let Err(error) = fs::remove_file(temp) {
                tracing::debug!(
                    path = %temp.display(),
                    %error,
                    "could not delete the compressed temp file"
                );
            }
            Ok(target_path)
        }
        Err(error) => {
            // The temp file must survive a failed compression.
            let _ = fs::remove_file(&target_path);
            Err(error)
        }
    }
}

#[cfg(test)]
#[path = "file_output_test.rs"]
mod file_output_test;
