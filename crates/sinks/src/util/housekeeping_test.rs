//! Tests for age/size housekeeping

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tempfile::TempDir;

use super::run;

/// A final-pattern file name for a moment in the past
fn token_for(now: DateTime<Utc>, days_ago: i64) -> String {
    (now - ChronoDuration::days(days_ago))
        .format("%Y%m%dT%H%M%S%3f")
        .to_string()
}

fn make_file(dir: &Path, name: &str, bytes: usize) {
    fs::write(dir.join(name), vec![b'x'; bytes]).unwrap();
}

fn remaining(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

const MB: usize = 1024 * 1024;

#[test]
fn test_age_preservation_beats_the_size_cap() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();

    // Ten days of 1 MB files, 10 MB total.
    let mut names = Vec::new();
    for days in (0..10).rev() {
        let name = format!("{}.log", token_for(now, days));
        make_file(dir.path(), &name, MB);
        names.push((days, name));
    }

    let report = run(
        dir.path(),
        ".log",
        None,
        Duration::from_secs(24 * 3600),
        (3 * MB) as u64,
        now,
    );

    // Files younger than a day survive regardless of the cap.
    let kept = remaining(dir.path());
    for (days, name) in &names {
        if *days < 1 {
            assert!(kept.contains(name), "{name} is preserved by age");
        }
    }
    // Oldest-first deletion until preserved + retained fits in 3 MB.
    assert_eq!(report.candidate_count, 10);
    assert_eq!(report.deleted_count, 7);
    assert_eq!(kept.len(), 3);
    let mut sorted = kept.clone();
    sorted.sort();
    // The three newest names survive.
    let mut expected: Vec<String> = names.iter().rev().take(3).map(|(_, n)| n.clone()).collect();
    expected.sort();
    assert_eq!(sorted, expected);
}

#[test]
fn test_no_size_cap_only_counts() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    make_file(dir.path(), &format!("{}.log", token_for(now, 5)), MB);

    let report = run(dir.path(), ".log", None, Duration::from_secs(3600), 0, now);
    assert_eq!(report.candidate_count, 1);
    assert_eq!(report.deleted_count, 0);
    assert_eq!(remaining(dir.path()).len(), 1);
}

#[test]
fn test_under_cap_deletes_nothing() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    for days in [5, 3] {
        make_file(dir.path(), &format!("{}.log", token_for(now, days)), MB);
    }

    let report = run(
        dir.path(),
        ".log",
        None,
        Duration::ZERO,
        (4 * MB) as u64,
        now,
    );
    assert_eq!(report.deleted_count, 0);
    assert_eq!(remaining(dir.path()).len(), 2);
}

#[test]
fn test_orphaned_temp_files_are_candidates() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    let stale = format!("T-{}.log.tmp", token_for(now, 9));
    make_file(dir.path(), &stale, MB);
    make_file(dir.path(), &format!("{}.log", token_for(now, 0)), MB);

    let report = run(dir.path(), ".log", None, Duration::ZERO, MB as u64, now);
    assert_eq!(report.candidate_count, 2);
    assert!(!dir.path().join(&stale).exists(), "stale temp is deleted first");
}

#[test]
fn test_foreign_files_are_untouched() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    make_file(dir.path(), "README.txt", MB);
    make_file(dir.path(), &format!("{}.other", token_for(now, 9)), MB);
    make_file(dir.path(), &format!("{}.log", token_for(now, 9)), MB);

    let report = run(dir.path(), ".log", None, Duration::ZERO, 1, now);
    assert_eq!(report.candidate_count, 1);
    assert!(dir.path().join("README.txt").exists());
    let kept = remaining(dir.path());
    assert_eq!(kept.len(), 2, "only the matching candidate was deleted");
}

#[test]
fn test_timed_folders_and_archive_are_scanned() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();

    let timed = dir.path().join(token_for(now, 6));
    fs::create_dir(&timed).unwrap();
    make_file(&timed, &format!("{}.log", token_for(now, 6)), MB);

    let archive = dir.path().join("Archive");
    let archived = archive.join(token_for(now, 8));
    fs::create_dir_all(&archived).unwrap();
    make_file(&archived, &format!("{}.log", token_for(now, 8)), MB);

    let report = run(dir.path(), ".log", None, Duration::ZERO, MB as u64, now);
    assert_eq!(report.candidate_count, 2);
    // The archived file is older and goes first; one file fits the cap.
    assert_eq!(report.deleted_count, 1);
    assert!(!archived.join(format!("{}.log", token_for(now, 8))).exists());
}

#[test]
fn test_emptied_timed_folders_are_removed() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();

    let timed = dir.path().join(token_for(now, 6));
    fs::create_dir(&timed).unwrap();
    make_file(&timed, &format!("{}.log", token_for(now, 6)), MB);

    let report = run(dir.path(), ".log", None, Duration::ZERO, 1, now);
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.removed_folders, 1);
    assert!(!timed.exists());
}

#[test]
fn test_directories_masquerading_as_candidates_are_ignored() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();
    let masquerade = dir.path().join(format!("{}.log", token_for(now, 9)));
    fs::create_dir(&masquerade).unwrap();
    make_file(dir.path(), &format!("{}.log", token_for(now, 8)), MB);
    make_file(dir.path(), &format!("{}.log", token_for(now, 7)), MB);

    let report = run(dir.path(), ".log", None, Duration::ZERO, MB as u64, now);
    // The directory is no candidate; both real files are, and the older
    // one goes to satisfy the cap.
    assert_eq!(report.candidate_count, 2);
    assert_eq!(report.deleted_count, 1);
    assert!(masquerade.exists());
}
