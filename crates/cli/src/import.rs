// tbase import - read a screener feed, reconcile it and commit the result

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tickerbase_feed::reader::ReadStats;
use tickerbase_feed::{CandidateRecord, FeedReader, RunResult, RunSummary};
use tickerbase_store::{CommitStats, CompanyStore};

use crate::exit_codes::{EXIT_CANCELLED, EXIT_RECORD_FAILURES};
use crate::paths;
use crate::CliError;

const SAMPLE_SIZE: usize = 5;

pub struct ImportArgs {
    pub file: PathBuf,
    pub exchange: String,
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub force: bool,
    pub dry_run: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub max_errors: usize,
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
struct DatabaseCounts {
    total: usize,
    exchange: usize,
}

/// JSON shape of `--json` / `--output`.
#[derive(Serialize)]
struct ImportReport<'a> {
    #[serde(flatten)]
    run: &'a RunResult,
    read: &'a ReadStats,
    dry_run: bool,
    commit: Option<CommitStats>,
    database: DatabaseCounts,
}

pub fn cmd_import(args: ImportArgs) -> Result<(), CliError> {
    paths::check_exchange(&args.exchange)?;
    let config = paths::load_feed_config(args.config.as_deref())?;

    let mut candidates = FeedReader::open(&args.file, &config, &args.exchange)
        .map_err(CliError::feed)?
        .candidates();
    let batch: Vec<CandidateRecord> = candidates.by_ref().collect();
    let read = candidates.stats().clone();

    eprintln!(
        "Found {} companies to import ({} rows read, {} skipped)",
        batch.len(),
        read.rows,
        read.skipped_total()
    );
    print_sample(&batch);

    if !batch.is_empty() && !args.force && !args.dry_run {
        confirm(batch.len())?;
    }

    let (db_path, mut store) = open_store(args.db, args.dry_run)?;
    let mut lookup = match store {
        Some(ref store) => store.load_lookup().map_err(CliError::store)?,
        None => HashMap::new(),
    };

    let result = tickerbase_feed::run(&config, &args.exchange, batch, &mut lookup);

    let commit = match store {
        Some(ref mut store) if !args.dry_run => {
            Some(store.commit(&result.outcomes).map_err(CliError::store)?)
        }
        _ => None,
    };

    let database = match store {
        Some(ref store) => DatabaseCounts {
            total: store.count().map_err(CliError::store)?,
            exchange: store.count_by_exchange(&args.exchange).map_err(CliError::store)?,
        },
        None => DatabaseCounts::default(),
    };

    print_summary(&result.summary, &args.exchange, args.max_errors);
    if args.dry_run {
        eprintln!("Dry run: nothing written to {}", db_path.display());
    }
    eprintln!();
    eprintln!("Database statistics:");
    eprintln!("  Total companies:   {}", database.total);
    eprintln!("  {} companies: {}", args.exchange, database.exchange);

    let report = ImportReport {
        run: &result,
        read: &read,
        dry_run: args.dry_run,
        commit,
        database,
    };
    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("failed to serialize report: {}", e)))?;
        println!("{}", json);
    }
    if let Some(ref output) = args.output {
        write_report(output, &report)?;
    }

    if args.strict && result.summary.failed > 0 {
        return Err(CliError::new(
            EXIT_RECORD_FAILURES,
            format!("{} of {} records failed", result.summary.failed, result.summary.total),
        ));
    }

    Ok(())
}

/// A dry run opens an existing database read-only and never creates one.
fn open_store(
    db: Option<PathBuf>,
    dry_run: bool,
) -> Result<(PathBuf, Option<CompanyStore>), CliError> {
    if !dry_run {
        let path = paths::prepare_db_path(db)?;
        let store = CompanyStore::open(&path).map_err(CliError::store)?;
        return Ok((path, Some(store)));
    }

    let path = paths::resolve_db_path(db);
    if !path.exists() {
        log::info!("{} does not exist, reconciling against an empty store", path.display());
        return Ok((path, None));
    }
    let store = CompanyStore::open_read_only(&path).map_err(CliError::store)?;
    Ok((path, Some(store)))
}

fn print_sample(batch: &[CandidateRecord]) {
    if batch.is_empty() {
        return;
    }
    eprintln!("Sample:");
    for c in batch.iter().take(SAMPLE_SIZE) {
        let sector = c.sector.as_deref().unwrap_or("-");
        match c.market_cap {
            Some(cap) => eprintln!("  {:<8} {} ({}, market cap {:.0})", c.ticker, c.name, sector, cap),
            None => eprintln!("  {:<8} {} ({})", c.ticker, c.name, sector),
        }
    }
}

/// `y`/`yes` proceeds. Anything else, including EOF, cancels.
fn confirm(count: usize) -> Result<(), CliError> {
    eprint!("Proceed with importing {} companies? (y/N) ", count);
    io::stderr().flush().ok();

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| CliError::io(format!("failed to read answer: {}", e)))?;

    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(CliError::new(EXIT_CANCELLED, "import cancelled")
            .with_hint("pass --force to skip the prompt")),
    }
}

fn print_summary(summary: &RunSummary, exchange: &str, max_errors: usize) {
    eprintln!();
    eprintln!("Import complete ({}):", exchange);
    eprintln!("  Total:     {}", summary.total);
    eprintln!("  Created:   {}", summary.created);
    eprintln!("  Updated:   {}", summary.updated);
    eprintln!("  Unchanged: {}", summary.unchanged);
    eprintln!("  Failed:    {}", summary.failed);

    if summary.failures.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("Errors:");
    for message in summary.failures.iter().take(max_errors) {
        eprintln!("  {}", message);
    }
    let rest = summary.failures.len().saturating_sub(max_errors);
    if rest > 0 {
        eprintln!("  ... and {} more errors", rest);
    }
}

fn write_report(path: &Path, report: &ImportReport<'_>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::io(format!("failed to serialize report: {}", e)))?;
    std::fs::write(path, json)
        .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}
