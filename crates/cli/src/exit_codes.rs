//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                                 |
//! |---------|------------------|---------------------------------------------|
//! | 0       | Universal        | Success (bootstrap included)                |
//! | 1       | Universal        | General error (unspecified)                 |
//! | 2       | Universal        | CLI usage error, missing incoming file      |
//! | 3-9     | merge            | Merge-specific codes                        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `merge_exit_code`

use cowork_recon::MergeError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, or the incoming batch file is missing.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Merge (3-9)
// =============================================================================

/// Malformed CSV lines found while `--malformed strict` is active.
pub const EXIT_MERGE_MALFORMED: u8 = 3;

/// Config file failed to parse or validate.
pub const EXIT_MERGE_CONFIG: u8 = 4;

/// Reading, staging or renaming a file failed.
pub const EXIT_MERGE_IO: u8 = 5;

/// Map a MergeError to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::MissingIncoming(_) => EXIT_USAGE,
        MergeError::ConfigParse(_) | MergeError::ConfigValidation(_) => EXIT_MERGE_CONFIG,
        MergeError::Malformed { .. } => EXIT_MERGE_MALFORMED,
        MergeError::Io { .. } => EXIT_MERGE_IO,
    }
}
