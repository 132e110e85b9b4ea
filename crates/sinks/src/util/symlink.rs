//! Last-run symlink maintenance
//!
//! The link points at the most recent finalized file. Creating symlinks
//! needs a privilege on some platforms; the first `PermissionDenied`
//! latches the feature off for the rest of the process so the engine
//! stops paying for attempts that can never succeed.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

static SYMLINKS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Whether the privilege latch has fired
pub fn symlinks_disabled() -> bool {
    SYMLINKS_DISABLED.load(Ordering::Acquire)
}

/// Point `link` at `target`, replacing the previous link
///
/// Best effort: failures are logged, a privilege failure latches the
/// feature off process-wide and warns exactly once.
pub(crate) fn refresh_last_run(link: &Path, target: &Path, previous: Option<&Path>) {
    if symlinks_disabled() {
        return;
    }
    if let Some(previous) = previous {
        let _ = fs::remove_file(previous);
    }
    if previous != Some(link) {
        let _ = fs::remove_file(link);
    }
    match create_symlink(target, link) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
            if !SYMLINKS_DISABLED.swap(true, Ordering::AcqRel) {
                tracing::warn!(
                    link = %link.display(),
                    %error,
                    "creating symbolic links requires a privilege this process lacks, disabling them"
                );
            }
        }
        Err(error) => {
            tracing::warn!(
                link = %link.display(),
                target = %target.display(),
                %error,
                "could not refresh the last-run symlink"
            );
        }
    }
}

/// Best-effort removal of an existing link
pub(crate) fn remove_link(link: &Path) {
    let _ = fs::remove_file(link);
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(test)]
pub(crate) fn reset_latch_for_tests() {
    SYMLINKS_DISABLED.store(false, Ordering::Release);
}

#[cfg(test)]
pub(crate) fn force_latch_for_tests() {
    SYMLINKS_DISABLED.store(true, Ordering::Release);
}
