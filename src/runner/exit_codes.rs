//! Documented exit codes for `strict-qa run`.

/// Every recorded case passed.
pub const OK: i32 = 0;

/// The run completed and found at least one FAIL or BUG.
pub const WEAKNESSES_FOUND: i32 = 1;

/// The harness itself failed: an adapter session could not be opened or the run
/// report could not be written.
pub const INFRASTRUCTURE_FAILED: i32 = 2;

/// The run was stopped with Ctrl+C.
pub const INTERRUPTED: i32 = 130;
