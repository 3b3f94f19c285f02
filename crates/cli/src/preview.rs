// tbase preview - filter a feed without touching the store

use std::path::PathBuf;

use serde::Serialize;
use tickerbase_feed::reader::ReadStats;
use tickerbase_feed::{CandidateRecord, FeedReader};

use crate::paths;
use crate::CliError;

#[derive(Serialize)]
struct PreviewReport<'a> {
    exchange: &'a str,
    read: &'a ReadStats,
    candidates: &'a [CandidateRecord],
}

pub fn cmd_preview(
    file: PathBuf,
    exchange: String,
    config: Option<PathBuf>,
    limit: usize,
    json: bool,
) -> Result<(), CliError> {
    paths::check_exchange(&exchange)?;
    let config = paths::load_feed_config(config.as_deref())?;

    let mut candidates = FeedReader::open(&file, &config, &exchange)
        .map_err(CliError::feed)?
        .candidates();
    let all: Vec<CandidateRecord> = candidates.by_ref().collect();
    let read = candidates.stats().clone();

    let shown = if limit == 0 { &all[..] } else { &all[..all.len().min(limit)] };

    if json {
        let report = PreviewReport { exchange: &exchange, read: &read, candidates: shown };
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("failed to serialize preview: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    println!("{:<8} {:<40} {:<24} {:>18}", "TICKER", "NAME", "SECTOR", "MARKET CAP");
    for c in shown {
        let cap = c.market_cap.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<40} {:<24} {:>18}",
            c.ticker,
            c.name,
            c.sector.as_deref().unwrap_or("-"),
            cap
        );
    }
    if shown.len() < all.len() {
        println!("... {} more", all.len() - shown.len());
    }

    eprintln!();
    eprintln!("{} rows read, {} candidates", read.rows, read.candidates);
    for (reason, count) in &read.skipped {
        eprintln!("  skipped {:<16} {}", reason.to_string(), count);
    }

    Ok(())
}
