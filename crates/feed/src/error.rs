use std::path::PathBuf;

use thiserror::Error;

/// Run-level failures. Anything here aborts the run before reconciliation starts.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The source file could not be opened.
    #[error("cannot open feed {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The header row could not be read.
    #[error("cannot read feed header: {0}")]
    Header(#[source] csv::Error),

    /// The config file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty table, bad pattern, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}
