//! Stable exit codes for the `experiments` CLI.

/// Every unit succeeded (or `--dry-run` printed the plan).
pub const OK: i32 = 0;
/// Invalid request or config, or a setup error. No unit was started.
pub const INVALID: i32 = 1;
/// All units ran, but at least one failed or the summary could not be written.
pub const FAILED: i32 = 2;
