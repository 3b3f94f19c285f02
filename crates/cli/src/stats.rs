// tbase stats - company counts in the store

use std::path::PathBuf;

use serde::Serialize;
use tickerbase_store::CompanyStore;

use crate::paths;
use crate::CliError;

#[derive(Serialize)]
struct ExchangeCount {
    exchange: String,
    companies: usize,
}

#[derive(Serialize)]
struct StatsReport {
    database: String,
    total: usize,
    exchanges: Vec<ExchangeCount>,
}

pub fn cmd_stats(db: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let path = paths::resolve_db_path(db);

    // A missing database has no companies; reading it must not create one.
    let report = if path.exists() {
        let store = CompanyStore::open_read_only(&path).map_err(CliError::store)?;
        StatsReport {
            database: path.display().to_string(),
            total: store.count().map_err(CliError::store)?,
            exchanges: store
                .exchange_counts()
                .map_err(CliError::store)?
                .into_iter()
                .map(|(exchange, companies)| ExchangeCount { exchange, companies })
                .collect(),
        }
    } else {
        log::info!("{} does not exist yet", path.display());
        StatsReport {
            database: path.display().to_string(),
            total: 0,
            exchanges: Vec::new(),
        }
    };

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("failed to serialize stats: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    println!("Database: {}", report.database);
    println!("Total companies: {}", report.total);
    for row in &report.exchanges {
        println!("  {:<10} {}", row.exchange, row.companies);
    }
    Ok(())
}
