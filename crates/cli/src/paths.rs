//! Default file locations and config resolution.

use std::path::{Path, PathBuf};

use tickerbase_feed::FeedConfig;

use crate::CliError;

/// `<config_dir>/tickerbase/feed.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tickerbase")
        .join("feed.toml")
}

/// `<data_dir>/tickerbase/companies.db`
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tickerbase")
        .join("companies.db")
}

/// `--config` if given, else the default file if it exists, else built-in tables.
pub fn load_feed_config(explicit: Option<&Path>) -> Result<FeedConfig, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path();
            if !path.exists() {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(FeedConfig::default());
            }
            path
        }
    };

    log::info!("loading feed config from {}", path.display());
    FeedConfig::load(&path).map_err(CliError::feed)
}

/// Every imported company is stamped with the exchange, so it must be named.
pub fn check_exchange(exchange: &str) -> Result<(), CliError> {
    if exchange.trim().is_empty() {
        return Err(CliError::usage("--exchange must not be empty")
            .with_hint("pass the listing exchange, e.g. --exchange NYSE"));
    }
    Ok(())
}

/// `--db` if given, else the default location. No filesystem access.
pub fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(default_db_path)
}

/// Resolve the database path and make sure its directory exists.
pub fn prepare_db_path(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    let path = resolve_db_path(explicit);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::new(
                    crate::exit_codes::EXIT_STORE,
                    format!("cannot create {}: {}", parent.display(), e),
                )
            })?;
        }
    }
    Ok(path)
}
