//! Tests for unique timestamped names

use chrono::{TimeZone, Utc};

use super::{create_exclusive, next_unique_name, remainder_matches_suffix, try_match, TOKEN_LEN};

#[test]
fn test_token_shape() {
    let token = next_unique_name(Utc::now());
    assert_eq!(token.len(), TOKEN_LEN);
    assert_eq!(token.as_bytes()[8], b'T');
}

#[test]
fn test_tokens_are_strictly_increasing() {
    let now = Utc::now();
    let mut previous = next_unique_name(now);
    // Same `now` every time: uniqueness must come from the generator.
    for _ in 0..200 {
        let token = next_unique_name(now);
        assert!(token > previous, "{token} must sort after {previous}");
        previous = token;
    }
}

#[test]
fn test_round_trip() {
    let time = Utc.with_ymd_and_hms(2024, 1, 31, 15, 30, 59).unwrap()
        + chrono::Duration::milliseconds(123);
    let token = next_unique_name(time);
    let (parsed, rest) = try_match(&token).unwrap();
    assert!(rest.is_empty());
    // The generator may bump past `time` if earlier tests consumed later
    // stamps; the parsed value always equals what was formatted.
    assert_eq!(super::format_token(parsed), token);
}

#[test]
fn test_try_match_fixed_example() {
    let (parsed, rest) = try_match("20240131T153059123.log").unwrap();
    assert_eq!(rest, ".log");
    let expected = Utc.with_ymd_and_hms(2024, 1, 31, 15, 30, 59).unwrap()
        + chrono::Duration::milliseconds(123);
    assert_eq!(parsed, expected);
}

#[test]
fn test_try_match_rejects_malformed_names() {
    assert!(try_match("not-a-token").is_none());
    assert!(try_match("20240131X153059123").is_none());
    assert!(try_match("2024013115305912").is_none()); // too short
    assert!(try_match("20241331T153059123").is_none()); // month 13
    assert!(try_match("échantillon-20240131").is_none());
}

#[test]
fn test_create_exclusive_probes_on_collision() {
    let dir = tempfile::TempDir::new().unwrap();
    let (_, first) = create_exclusive(dir.path(), "stamp", ".log").unwrap();
    let (_, second) = create_exclusive(dir.path(), "stamp", ".log").unwrap();
    let (_, third) = create_exclusive(dir.path(), "stamp", ".log").unwrap();

    assert_eq!(first.file_name().unwrap(), "stamp.log");
    assert_eq!(second.file_name().unwrap(), "stamp(1).log");
    assert_eq!(third.file_name().unwrap(), "stamp(2).log");
}

#[test]
fn test_remainder_suffix_matching() {
    assert!(remainder_matches_suffix(".log", ".log"));
    assert!(remainder_matches_suffix("(3).log", ".log"));
    assert!(!remainder_matches_suffix(".log.gz", ".log"));
    assert!(!remainder_matches_suffix("x.log", ".log"));
    assert!(!remainder_matches_suffix("().log", ".log"));
}
