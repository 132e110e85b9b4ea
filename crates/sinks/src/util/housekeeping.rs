//! Age/size housekeeping over produced files
//!
//! Walks the root, the timed folders, and the archive, collects every file
//! this engine could have produced (temp or final), and deletes from the
//! oldest end until the total fits under the configured cap — never
//! touching files younger than the time to keep. Emptied timed folders
//! are removed afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::timed_folders::{timed_folder_date, ARCHIVE_FOLDER_NAME};
use super::unique_name::{remainder_matches_suffix, try_match};

/// Outcome of one housekeeping run
#[derive(Debug, Clone, Copy, Default)]
pub struct HousekeepingReport {
    /// Files considered
    pub candidate_count: usize,
    /// Their total size
    pub candidate_bytes: u64,
    /// Files preserved by age
    pub preserved_count: usize,
    /// Bytes preserved by age
    pub preserved_bytes: u64,
    /// Files deleted
    pub deleted_count: usize,
    /// Bytes freed
    pub deleted_bytes: u64,
    /// Emptied timed folders removed
    pub removed_folders: usize,
}

struct Candidate {
    path: PathBuf,
    date: DateTime<Utc>,
    size: u64,
}

pub(crate) fn run(
    root: &Path,
    suffix: &str,
    current_temp: Option<&Path>,
    min_age: Duration,
    max_total_bytes: u64,
    now: DateTime<Utc>,
) -> HousekeepingReport {
    let mut candidates = Vec::new();
    let mut timed_dirs = Vec::new();
    scan(root, false, suffix, current_temp, &mut candidates, &mut timed_dirs);

    let mut report = HousekeepingReport {
        candidate_count: candidates.len(),
        candidate_bytes: candidates.iter().map(|c| c.size).sum(),
        ..HousekeepingReport::default()
    };

    let cutoff = now - chrono::Duration::from_std(min_age).unwrap_or(chrono::Duration::zero());
    let mut deletable: Vec<&Candidate> = Vec::new();
    for candidate in &candidates {
        if candidate.date >= cutoff {
            report.preserved_count += 1;
            report.preserved_bytes += candidate.size;
        } else {
            deletable.push(candidate);
        }
    }

    if max_total_bytes > 0 && report.candidate_bytes > max_total_bytes && !deletable.is_empty() {
        // Newest first; deletion starts from the oldest end.
        deletable.sort_by(|a, b| b.date.cmp(&a.date));
        let mut retained: u64 = deletable.iter().map(|c| c.size).sum();
        for candidate in deletable.iter().rev() {
            if report.preserved_bytes + retained <= max_total_bytes {
                break;
            }
            match fs::remove_file(&candidate.path) {
                Ok(()) => {
                    retained -= candidate.size;
                    report.deleted_count += 1;
                    report.deleted_bytes += candidate.size;
                }
                Err(error) => {
                    tracing::warn!(
                        path = %candidate.path.display(),
                        %error,
                        "housekeeping could not delete a log file"
                    );
                }
            }
        }
    }

    // Deepest first, so folders emptied inside the archive are gone before
    // their parent is checked.
    timed_dirs.sort_by_key(|path: &PathBuf| std::cmp::Reverse(path.components().count()));
    for folder in &timed_dirs {
        let is_empty = fs::read_dir(folder)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty {
            continue;
        }
        match fs::remove_dir(folder) {
            Ok(()) => report.removed_folders += 1,
            Err(error) => {
                tracing::warn!(
                    folder = %folder.display(),
                    %error,
                    "housekeeping could not remove an empty timed folder"
                );
            }
        }
    }

    tracing::debug!(
        candidates = report.candidate_count,
        deleted = report.deleted_count,
        freed_bytes = report.deleted_bytes,
        "file housekeeping finished"
    );
    report
}

fn scan(
    dir: &Path,
    in_archive: bool,
    suffix: &str,
    current_temp: Option<&Path>,
    candidates: &mut Vec<Candidate>,
    timed_dirs: &mut Vec<PathBuf>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(dir = %dir.display(), %error, "housekeeping could not list a folder");
            return;
        }
    };
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let path = entry.path();

        if file_type.is_dir() {
            if name.eq_ignore_ascii_case(ARCHIVE_FOLDER_NAME) {
                scan(&path, true, suffix, current_temp, candidates, timed_dirs);
            } else if timed_folder_date(&name, in_archive).is_some() {
                timed_dirs.push(path.clone());
                scan(&path, in_archive, suffix, current_temp, candidates, timed_dirs);
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }
        if current_temp.is_some_and(|open| open == path) {
            continue;
        }
        if let Some(date) = candidate_date(&name, suffix) {
            match entry.metadata() {
                Ok(metadata) => candidates.push(Candidate {
                    path,
                    date,
                    size: metadata.len(),
                }),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "could not stat a candidate");
                }
            }
        }
    }
}

/// The token of a produced file name, temp or final
fn candidate_date(name: &str, suffix: &str) -> Option<DateTime<Utc>> {
    if let Some(rest) = name.strip_prefix("T-") {
        let (date, remainder) = try_match(rest)?;
        let remainder = remainder.strip_suffix(".tmp")?;
        remainder_matches_suffix(remainder, suffix).then_some(date)
    } else {
        let (date, remainder) = try_match(name)?;
        remainder_matches_suffix(remainder, suffix).then_some(date)
    }
}

#[cfg(test)]
#[path = "housekeeping_test.rs"]
mod housekeeping_test;
