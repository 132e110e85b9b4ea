//! Tests for the rotation state machine

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::TempDir;

use super::{FileOutput, FileOutputOptions, FileOutputUpdate};

fn options(suffix: &str, max: u32) -> FileOutputOptions {
    FileOutputOptions {
        file_name_suffix: suffix.into(),
        max_count_per_file: max,
        use_gzip: false,
        timed_folder_mode: false,
        with_last_run_symlink: false,
        last_run_file_name: "LastRun.log".into(),
    }
}

fn write_line(output: &mut FileOutput, line: &str) {
    let line = line.to_owned();
    output
        .write_with(move |w| {
            w.write_all(line.as_bytes())?;
            w.write_all(b"\n")
        })
        .unwrap();
}

fn finalized_files(dir: &Path, suffix: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with("T-") && n.ends_with(suffix))
        .collect();
    names.sort();
    names
}

fn temp_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("T-") && n.ends_with(".tmp"))
        .collect()
}

#[test]
fn test_rejects_unusable_options() {
    assert!(FileOutput::new(options("", 10)).is_err());
    assert!(FileOutput::new(options(".log", 0)).is_err());

    let mut bad_symlink = options(".log", 10);
    bad_symlink.with_last_run_symlink = true;
    bad_symlink.last_run_file_name = String::new();
    assert!(FileOutput::new(bad_symlink).is_err());
}

#[test]
fn test_write_before_initialize_fails() {
    let mut output = FileOutput::new(options(".log", 10)).unwrap();
    let result = output.write_with(|w| w.write_all(b"x"));
    assert!(result.is_err());
}

#[test]
fn test_rotation_produces_ceil_entries_over_cap_files() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 3)).unwrap();
    assert!(output.initialize(dir.path()));

    for i in 0..7 {
        write_line(&mut output, &format!("entry {i}"));
    }
    // 7 entries, 3 per file: two finalized, one open temp with the rest.
    assert_eq!(finalized_files(dir.path(), ".log").len(), 2);
    assert_eq!(temp_files(dir.path()).len(), 1);

    output.close(false);
    assert_eq!(finalized_files(dir.path(), ".log").len(), 3);
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn test_at_most_one_open_temp_file() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 2)).unwrap();
    assert!(output.initialize(dir.path()));

    for i in 0..9 {
        write_line(&mut output, &format!("entry {i}"));
        assert!(temp_files(dir.path()).len() <= 1);
    }
}

#[test]
fn test_finalized_names_sort_chronologically_and_parse_back() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 1)).unwrap();
    assert!(output.initialize(dir.path()));

    for i in 0..5 {
        write_line(&mut output, &format!("entry {i}"));
    }

    let names = finalized_files(dir.path(), ".log");
    assert_eq!(names.len(), 5);
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    for name in &names {
        let (_, rest) = super::unique_name::try_match(name).expect("name must parse");
        assert_eq!(rest, ".log");
    }
}

#[test]
fn test_untouched_file_is_discarded_on_close() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 5)).unwrap();
    assert!(output.initialize(dir.path()));

    write_line(&mut output, "only");
    assert!(output.close(false).is_some());

    // Closing again with nothing open produces nothing.
    assert!(output.close(false).is_none());
    assert_eq!(finalized_files(dir.path(), ".log").len(), 1);
}

#[test]
fn test_forget_discards_written_entries() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 5)).unwrap();
    assert!(output.initialize(dir.path()));

    write_line(&mut output, "doomed");
    assert!(output.close(true).is_none());
    assert!(finalized_files(dir.path(), ".log").is_empty());
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn test_gzip_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(".log", 3);
    opts.use_gzip = true;
    let mut output = FileOutput::new(opts).unwrap();
    assert!(output.initialize(dir.path()));

    for i in 0..3 {
        write_line(&mut output, &format!("compressed entry {i}"));
    }

    let names = finalized_files(dir.path(), ".log");
    assert_eq!(names.len(), 1, "extension is unchanged by gzip");

    let file = fs::File::open(dir.path().join(&names[0])).unwrap();
    let mut decoder = flate2::read::GzDecoder::new(file);
    let mut text = String::new();
    decoder.read_to_string(&mut text).unwrap();
    assert_eq!(
        text,
        "compressed entry 0\ncompressed entry 1\ncompressed entry 2\n"
    );
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn test_reconfigure_gzip_change_closes_current_file() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 10)).unwrap();
    assert!(output.initialize(dir.path()));

    write_line(&mut output, "plain");
    output.reconfigure(FileOutputUpdate {
        use_gzip: Some(true),
        ..FileOutputUpdate::default()
    });

    // The plain file was finalized by the switch.
    assert_eq!(finalized_files(dir.path(), ".log").len(), 1);

    write_line(&mut output, "zipped");
    output.close(false);
    assert_eq!(finalized_files(dir.path(), ".log").len(), 2);
}

#[test]
fn test_reconfigure_reducing_cap_below_written_closes() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 10)).unwrap();
    assert!(output.initialize(dir.path()));

    for i in 0..4 {
        write_line(&mut output, &format!("entry {i}"));
    }
    output.reconfigure(FileOutputUpdate {
        max_count_per_file: Some(3),
        ..FileOutputUpdate::default()
    });
    // Four entries were already in; the cap of three forces a close.
    assert_eq!(finalized_files(dir.path(), ".log").len(), 1);
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn test_reconfigure_raising_cap_keeps_file_open() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 3)).unwrap();
    assert!(output.initialize(dir.path()));

    write_line(&mut output, "one");
    write_line(&mut output, "two");
    output.reconfigure(FileOutputUpdate {
        max_count_per_file: Some(10),
        ..FileOutputUpdate::default()
    });
    assert!(finalized_files(dir.path(), ".log").is_empty());

    // Eight more entries fit before the raised cap rotates.
    for i in 0..8 {
        write_line(&mut output, &format!("more {i}"));
    }
    assert_eq!(finalized_files(dir.path(), ".log").len(), 1);
}

#[test]
fn test_deactivate_then_reinitialize_reuses_root_and_timed_folder() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(".log", 5);
    opts.timed_folder_mode = true;
    let mut output = FileOutput::new(opts).unwrap();

    assert!(output.initialize(dir.path()));
    write_line(&mut output, "first life");
    let base_before = output.base_path().unwrap().to_path_buf();
    let root_before = output.root_path().unwrap().to_path_buf();

    output.deactivate();
    assert!(output.base_path().is_none());

    assert!(output.initialize(dir.path()));
    assert_eq!(output.root_path().unwrap(), root_before);
    assert_eq!(
        output.base_path().unwrap(),
        base_before,
        "the surviving timed folder is reused"
    );
}

#[test]
fn test_timed_folder_is_created_lazily() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(".log", 5);
    opts.timed_folder_mode = true;
    let mut output = FileOutput::new(opts).unwrap();
    assert!(output.initialize(dir.path()));

    let base = output.base_path().unwrap().to_path_buf();
    assert!(!base.exists(), "timed folder appears on first write only");

    write_line(&mut output, "materialize");
    assert!(base.exists());
}

#[cfg(unix)]
#[test]
fn test_last_run_symlink_follows_finalized_files() {
    super::symlink::reset_latch_for_tests();
    let dir = TempDir::new().unwrap();
    let mut opts = options(".log", 1);
    opts.with_last_run_symlink = true;
    let mut output = FileOutput::new(opts).unwrap();
    assert!(output.initialize(dir.path()));

    write_line(&mut output, "first");
    write_line(&mut output, "second");

    if super::symlink::symlinks_disabled() {
        // Another test latched the feature off; nothing to assert here.
        return;
    }
    let link = dir.path().join("LastRun.log");
    let target = fs::read_link(&link).unwrap();
    let names = finalized_files(dir.path(), ".log");
    assert_eq!(
        target.file_name().unwrap().to_string_lossy(),
        names.last().unwrap().as_str()
    );

    // Disabling through reconfigure removes the link.
    output.reconfigure(FileOutputUpdate {
        with_last_run_symlink: Some(false),
        ..FileOutputUpdate::default()
    });
    assert!(!link.exists());
}

#[test]
fn test_housekeeping_rejects_two_zero_caps() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 5)).unwrap();
    assert!(output.initialize(dir.path()));
    assert!(output
        .run_file_housekeeping(std::time::Duration::ZERO, 0)
        .is_err());
}

#[test]
fn test_housekeeping_skips_the_open_temp_file() {
    let dir = TempDir::new().unwrap();
    let mut output = FileOutput::new(options(".log", 100)).unwrap();
    assert!(output.initialize(dir.path()));

    write_line(&mut output, "still open");
    let report = output
        .run_file_housekeeping(std::time::Duration::ZERO, 1)
        .unwrap();
    assert_eq!(report.candidate_count, 0);
    assert_eq!(temp_files(dir.path()).len(), 1);
}
