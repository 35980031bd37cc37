//! Best-effort working directory creation.

use std::fs;
use std::path::Path;

use tracing::warn;

/// Create `path` and its parents. Returns whether the directory exists afterwards.
///
/// Failure is logged and otherwise ignored; the phases that follow will
/// report their own errors if the directory is really unusable.
pub fn ensure_working_dir(path: &Path) -> bool {
    match fs::create_dir_all(path) {
        Ok(()) => true,
        Err(err) => {
            warn!(dir = %path.display(), err = %err, "creation of working directory failed");
            false
        }
    }
}
