//! Unique timestamped file names
//!
//! `next_unique_name` yields strictly increasing `YYYYMMDDThhmmssfff`
//! tokens across the whole process, so names sort chronologically and
//! never repeat even when the wall clock stalls or steps backwards.
//! `try_match` parses a token back out of a file or folder name.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};

/// Length of the textual token: `20240131T153059123`
pub const TOKEN_LEN: usize = 18;

static LAST: Mutex<Option<DateTime<Utc>>> = Mutex::new(None);

/// Produce the next unique token
///
/// The token is `now` truncated to the millisecond, bumped past the
/// previous token when the clock did not advance.
pub fn next_unique_name(now: DateTime<Utc>) -> String {
    let mut last = LAST.lock().unwrap_or_else(|p| p.into_inner());
    let mut candidate = truncate_to_ms(now);
    if let Some(previous) = *last {
        if candidate <= previous {
            candidate = previous + ChronoDuration::milliseconds(1);
        }
    }
    *last = Some(candidate);
    format_token(candidate)
}

/// Parse a token from the front of `name`
///
/// Returns the decoded UTC time and whatever follows the token.
pub fn try_match(name: &str) -> Option<(DateTime<Utc>, &str)> {
    if name.len() < TOKEN_LEN || !name.is_char_boundary(TOKEN_LEN) {
        return None;
    }
    let (token, rest) = name.split_at(TOKEN_LEN);
    let bytes = token.as_bytes();
    if bytes[8] != b'T' {
        return None;
    }
    for (index, byte) in bytes.iter().enumerate() {
        if index != 8 && !byte.is_ascii_digit() {
            return None;
        }
    }

    let digits = |range: std::ops::Range<usize>| -> u32 {
        token[range].parse().unwrap_or(0)
    };
    let date = NaiveDate::from_ymd_opt(
        token[0..4].parse().ok()?,
        digits(4..6),
        digits(6..8),
    )?;
    let time = date.and_hms_milli_opt(digits(9..11), digits(11..13), digits(13..15), digits(15..18))?;
    Some((Utc.from_utc_datetime(&time), rest))
}

fn format_token(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%S%3f").to_string()
}

fn truncate_to_ms(time: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(time.timestamp_millis())
        .single()
        .unwrap_or(time)
}

/// Create a file that is guaranteed fresh
///
/// Tries `{stem}{tail}` first and probes with `({n})` infixes until an
/// exclusive creation succeeds, so two outputs colliding on a name can
/// never clobber each other.
pub(crate) fn create_exclusive(dir: &Path, stem: &str, tail: &str) -> io::Result<(File, PathBuf)> {
    let mut attempt: u32 = 0;
    loop {
        let name = if attempt == 0 {
            format!("{stem}{tail}")
        } else {
            format!("{stem}({attempt}){tail}")
        };
        let path = dir.join(name);
        match OpenOptions::new().create_new(true).write(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(error) => return Err(error),
        }
    }
}

/// Whether `remainder` is the given suffix, allowing a `({n})` collision
/// infix between token and suffix
pub(crate) fn remainder_matches_suffix(remainder: &str, suffix: &str) -> bool {
    let Some(infix) = remainder.strip_suffix(suffix) else {
        return false;
    };
    if infix.is_empty() {
        return true;
    }
    infix
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
#[path = "unique_name_test.rs"]
mod unique_name_test;
