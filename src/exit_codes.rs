//! Process exit codes used by the driver.

/// Successful execution, including `--help` / `--version` output.
pub const EXIT_SUCCESS: i32 = 0;

/// Usage outcome: traversal ended without a bound command.
pub const EXIT_WARNING: i32 = 1;

/// Binding, coercion or engine-level parse failure.
pub const EXIT_ERROR: i32 = 2;
