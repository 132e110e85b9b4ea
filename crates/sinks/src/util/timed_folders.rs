//! Timed-folder lifecycle
//!
//! Timed folders are subdirectories named by a bare timestamp token, one
//! per handler lifetime. When too many pile up at the root, the oldest
//! move into `Archive/`; when the archive itself overflows its cap, the
//! oldest archived folders are deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use scribe_config::TimedFolderConfig;
use uuid::Uuid;

use super::unique_name::try_match;

/// Name of the archive directory, matched case-insensitively
pub(crate) const ARCHIVE_FOLDER_NAME: &str = "Archive";

/// Whether a directory name is a timed folder
///
/// At the root only the bare token counts; inside the archive a `-{uuid}`
/// suffix (from a collision-resolved move) is accepted as well.
pub(crate) fn timed_folder_date(name: &str, allow_uuid_suffix: bool) -> Option<DateTime<Utc>> {
    let (date, rest) = try_match(name)?;
    if rest.is_empty() {
        return Some(date);
    }
    if allow_uuid_suffix {
        if let Some(candidate) = rest.strip_prefix('-') {
            if Uuid::parse_str(candidate).is_ok() {
                return Some(date);
            }
        }
    }
    None
}

/// Enforce the current and archived caps under `root`
///
/// The current base folder is never counted or moved; one extra slot is
/// reserved so it can land in the kept set after its own closure.
pub(crate) fn enforce(
    root: &Path,
    current_base: Option<&Path>,
    config: &TimedFolderConfig,
) -> io::Result<()> {
    let mut timed: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();
    let mut archive: Option<PathBuf> = None;

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.eq_ignore_ascii_case(ARCHIVE_FOLDER_NAME) {
            archive = Some(entry.path());
            continue;
        }
        let Some(date) = timed_folder_date(&name, false) else {
            continue;
        };
        if current_base.is_some_and(|base| base == entry.path()) {
            continue;
        }
        timed.push((date, entry.path()));
    }

    if config.max_current_log_folder_count > 0
        && timed.len() >= config.max_current_log_folder_count as usize
    {
        // Most recent first; duplicates in the listing sort adjacently and
        // are harmless.
        timed.sort_by(|a, b| b.0.cmp(&a.0));
        let move_count = timed.len() - (config.max_current_log_folder_count as usize - 1);

        let archive_path = match &archive {
            Some(path) => path.clone(),
            None => {
                let path = root.join(ARCHIVE_FOLDER_NAME);
                fs::create_dir_all(&path)?;
                path
            }
        };

        for (_, folder) in timed.iter().rev().take(move_count) {
            let Some(file_name) = folder.file_name() else {
                continue;
            };
            let mut target = archive_path.join(file_name);
            if target.exists() {
                target = archive_path.join(format!(
                    "{}-{}",
                    file_name.to_string_lossy(),
                    Uuid::new_v4()
                ));
            }
            fs::rename(folder, &target)?;
            tracing::debug!(
                from = %folder.display(),
                to = %target.display(),
                "archived timed folder"
            );
        }
        archive = Some(archive_path);
    }

    if config.max_archived_log_folder_count > 0 {
        if let Some(archive_path) = archive {
            prune_archive(&archive_path, config.max_archived_log_folder_count as usize)?;
        }
    }

    Ok(())
}

fn prune_archive(archive: &Path, cap: usize) -> io::Result<()> {
    let mut archived: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();
    for entry in fs::read_dir(archive)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(date) = timed_folder_date(&name.to_string_lossy(), true) {
            archived.push((date, entry.path()));
        }
    }
    if archived.len() <= cap {
        return Ok(());
    }
    archived.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, folder) in archived.iter().skip(cap) {
        fs::remove_dir_all(folder)?;
        tracing::debug!(folder = %folder.display(), "deleted archived timed folder");
    }
    Ok(())
}

#[cfg(test)]
#[path = "timed_folders_test.rs"]
mod timed_folders_test;
