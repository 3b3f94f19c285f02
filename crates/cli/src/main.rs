// tbase - listing feed importer for the company store

mod exit_codes;
mod import;
mod paths;
mod preview;
mod stats;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tickerbase_feed::FeedError;
use tickerbase_store::StoreError;

use exit_codes::{feed_exit_code, EXIT_ERROR, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tbase")]
#[command(about = "Import exchange listing feeds into the company store")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a screener CSV and reconcile it into the company store
    #[command(after_help = "\
Examples:
  tbase import nasdaq_screener.csv
  tbase import nyse.csv --exchange NYSE --force
  tbase import nasdaq_screener.csv --dry-run --json
  tbase import nasdaq_screener.csv --force --strict --output run.json")]
    Import {
        /// Screener CSV export
        file: PathBuf,

        /// Exchange every imported company is listed on
        #[arg(long, default_value = "NASDAQ")]
        exchange: String,

        /// Company database (default: <data_dir>/tickerbase/companies.db)
        #[arg(long, env = "TICKERBASE_DB")]
        db: Option<PathBuf>,

        /// Feed config TOML (default: <config_dir>/tickerbase/feed.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,

        /// Reconcile and report without writing to the database
        #[arg(long)]
        dry_run: bool,

        /// Print the run result as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write the run result as JSON to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Failure messages to print before truncating
        #[arg(long, default_value_t = 5)]
        max_errors: usize,

        /// Exit 7 when any record failed
        #[arg(long)]
        strict: bool,
    },

    /// Show which rows of a screener CSV would be imported
    #[command(after_help = "\
Examples:
  tbase preview nasdaq_screener.csv
  tbase preview nasdaq_screener.csv --limit 0 --json")]
    Preview {
        /// Screener CSV export
        file: PathBuf,

        /// Exchange stamped on the previewed candidates
        #[arg(long, default_value = "NASDAQ")]
        exchange: String,

        /// Feed config TOML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Candidates to print (0 = all)
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Print candidates and counts as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Company counts in the store
    Stats {
        /// Company database (default: <data_dir>/tickerbase/companies.db)
        #[arg(long, env = "TICKERBASE_DB")]
        db: Option<PathBuf>,

        /// Print counts as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nfeed:    tickerbase-feed ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nfeed:    tickerbase-feed ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

/// Install the stderr log subscriber. `log` records from the library crates
/// reach it through the tracing-log bridge.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Import {
            file,
            exchange,
            db,
            config,
            force,
            dry_run,
            json,
            output,
            max_errors,
            strict,
        } => import::cmd_import(import::ImportArgs {
            file,
            exchange,
            db,
            config,
            force,
            dry_run,
            json,
            output,
            max_errors,
            strict,
        }),
        Commands::Preview { file, exchange, config, limit, json } => {
            preview::cmd_preview(file, exchange, config, limit, json)
        }
        Commands::Stats { db, json } => stats::cmd_stats(db, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Run-level feed error with the matching exit code.
    pub fn feed(err: FeedError) -> Self {
        let code = feed_exit_code(&err);
        let hint = match &err {
            FeedError::Open { .. } => Some("check the path to the screener CSV".to_string()),
            FeedError::Header(_) => {
                Some("the first line must be the column header row".to_string())
            }
            FeedError::ConfigParse(_) | FeedError::ConfigValidation(_) => {
                Some("fix the feed config or pass --config with a valid file".to_string())
            }
            FeedError::ConfigRead { .. } => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn store(err: StoreError) -> Self {
        let hint = match &err {
            StoreError::Open { .. } => {
                Some("set --db or TICKERBASE_DB to a writable location".to_string())
            }
            _ => None,
        };
        Self { code: EXIT_STORE, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
