//! The rotating file engine
//!
//! Everything file handlers share: unique timestamped names, the rotation
//! state machine, timed-folder archival, housekeeping, and the last-run
//! symlink latch.

mod file_output;
mod housekeeping;
mod symlink;
mod timed_folders;
mod unique_name;

pub use file_output::{FileOutput, FileOutputOptions, FileOutputUpdate};
pub use housekeeping::HousekeepingReport;
pub use symlink::symlinks_disabled;
pub use unique_name::{next_unique_name, try_match, TOKEN_LEN};
