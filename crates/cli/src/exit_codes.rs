//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success (review rows are not a failure)              |
//! | 1    | General error (unspecified)                          |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Invalid job file (parse, validation, unknown column) |
//! | 4    | Precondition refused (no master rows, no source)     |
//! | 5    | Table could not be read or parsed                    |
//! | 6    | Output could not be written                          |

use keylink_io::TableError;
use keylink_match::MatchError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Job file is unreadable TOML, fails validation, or names a column
/// that the loaded table does not have.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Matching refused to start, or an export was asked for without the data
/// it needs.
pub const EXIT_PRECONDITION: u8 = 4;

/// Input table missing, unsupported, or unparseable.
pub const EXIT_READ: u8 = 5;

/// Output table could not be written.
pub const EXIT_WRITE: u8 = 6;

/// Map a MatchError to its exit code.
pub fn match_exit_code(err: &MatchError) -> u8 {
    match err {
        MatchError::EmptyMaster
        | MatchError::NoActiveSources
        | MatchError::MissingPreviousMaster
        | MatchError::NoResults => EXIT_PRECONDITION,
        MatchError::TooManySources { .. }
        | MatchError::UnknownColumn { .. }
        | MatchError::ConfigParse(_)
        | MatchError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        MatchError::UnknownSource(_) | MatchError::MissingAlternative { .. } => EXIT_ERROR,
    }
}

/// Map a TableError to its exit code.
pub fn table_exit_code(err: &TableError) -> u8 {
    match err {
        TableError::Write { .. } | TableError::TooLarge { .. } => EXIT_WRITE,
        TableError::UnsupportedFormat { .. } | TableError::Read { .. } | TableError::Parse { .. } => {
            EXIT_READ
        }
    }
}
