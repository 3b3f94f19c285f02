//! CLI Exit Code Registry
//!
//! Single source of truth for `tbase` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | Usage error (bad args)                                   |
//! | 3    | Feed source missing or unreadable; nothing was imported  |
//! | 4    | Company store could not be opened, read or committed     |
//! | 5    | Invalid feed config                                      |
//! | 6    | Import cancelled at the confirmation prompt              |
//! | 7    | Import finished with per-record failures (`--strict`)    |

use tickerbase_feed::FeedError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// The feed file could not be opened or its header read.
pub const EXIT_SOURCE: u8 = 3;

/// Database open/query/commit failure. A failed commit writes nothing.
pub const EXIT_STORE: u8 = 4;

/// Feed config could not be read, parsed or validated.
pub const EXIT_CONFIG: u8 = 5;

/// User declined the confirmation prompt.
pub const EXIT_CANCELLED: u8 = 6;

/// Some candidates failed reconciliation. Only with `--strict`.
pub const EXIT_RECORD_FAILURES: u8 = 7;

/// Map a run-level feed error to its exit code.
pub fn feed_exit_code(err: &FeedError) -> u8 {
    match err {
        FeedError::Open { .. } | FeedError::Header(_) => EXIT_SOURCE,
        FeedError::ConfigRead { .. } | FeedError::ConfigParse(_) | FeedError::ConfigValidation(_) => {
            EXIT_CONFIG
        }
    }
}
