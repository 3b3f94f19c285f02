// SQLite company store
// The persistence side of an import: loads the lookup, commits outcomes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use tickerbase_feed::model::{CompanyRecord, Outcome};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY,                 -- UUID v4
    ticker TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    exchange TEXT NOT NULL,
    sector TEXT,
    market_cap REAL,
    is_selected INTEGER NOT NULL DEFAULT 0,
    selection_date TEXT,
    created_at TEXT NOT NULL,            -- RFC 3339
    updated_at TEXT                      -- RFC 3339, NULL until first update
);

CREATE INDEX IF NOT EXISTS idx_companies_selected ON companies (is_selected);
CREATE INDEX IF NOT EXISTS idx_companies_exchange ON companies (exchange);
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("company {ticker}: bad timestamp '{value}'")]
    Timestamp { ticker: String, value: String },

    #[error("company {0} vanished before its update was committed")]
    MissingCompany(String),
}

/// Rows written by one [`CompanyStore::commit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitStats {
    pub inserted: usize,
    pub updated: usize,
}

pub struct CompanyStore {
    conn: Connection,
}

impl CompanyStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an existing database without creating it or touching the schema.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Every company, keyed by ticker.
    pub fn load_lookup(&self) -> Result<HashMap<String, CompanyRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ticker, name, exchange, sector, market_cap, created_at, updated_at FROM companies",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut lookup = HashMap::new();
        for row in rows {
            let (ticker, name, exchange, sector, market_cap, created_at, updated_at) = row?;
            let created_at = parse_timestamp(&ticker, created_at)?;
            let updated_at = parse_timestamp(&ticker, updated_at)?;
            lookup.insert(
                ticker.clone(),
                CompanyRecord {
                    ticker,
                    name,
                    exchange,
                    sector,
                    market_cap,
                    created_at,
                    updated_at,
                },
            );
        }

        log::debug!("loaded {} companies", lookup.len());
        Ok(lookup)
    }

    /// Write a run's outcomes in a single transaction.
    ///
    /// `Created` rows are inserted, `Updated` patches applied; `Unchanged` and
    /// `Failed` are skipped. Any error rolls the whole run back.
    pub fn commit(&mut self, outcomes: &[Outcome]) -> Result<CommitStats, StoreError> {
        let tx = self.conn.transaction()?;
        let mut stats = CommitStats::default();

        {
            let mut insert = tx.prepare(
                "INSERT INTO companies (id, ticker, name, exchange, sector, market_cap, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            let mut update = tx.prepare(
                "UPDATE companies SET
                    name = CASE WHEN ?2 THEN ?3 ELSE name END,
                    sector = CASE WHEN ?4 THEN ?5 ELSE sector END,
                    market_cap = CASE WHEN ?6 THEN ?7 ELSE market_cap END,
                    updated_at = ?8
                 WHERE ticker = ?1",
            )?;
            let created_at = Utc::now().to_rfc3339();

            for outcome in outcomes {
                match outcome {
                    Outcome::Created { record } => {
                        insert.execute(params![
                            uuid::Uuid::new_v4().to_string(),
                            record.ticker,
                            record.name,
                            record.exchange,
                            record.sector,
                            record.market_cap,
                            created_at,
                        ])?;
                        stats.inserted += 1;
                    }
                    Outcome::Updated {
                        ticker,
                        patch,
                        updated_at,
                        ..
                    } => {
                        let sector = patch.sector.clone().flatten();
                        let market_cap = patch.market_cap.flatten();
                        let changed = update.execute(params![
                            ticker,
                            patch.name.is_some(),
                            patch.name,
                            patch.sector.is_some(),
                            sector,
                            patch.market_cap.is_some(),
                            market_cap,
                            updated_at.to_rfc3339(),
                        ])?;
                        if changed == 0 {
                            return Err(StoreError::MissingCompany(ticker.clone()));
                        }
                        stats.updated += 1;
                    }
                    Outcome::Unchanged { .. } | Outcome::Failed { .. } => {}
                }
            }
        }

        tx.commit()?;
        log::info!(
            "committed {} new and {} updated companies",
            stats.inserted,
            stats.updated
        );
        Ok(stats)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn count_by_exchange(&self, exchange: &str) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM companies WHERE exchange = ?1",
            params![exchange],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// `(exchange, count)` pairs, largest first.
    pub fn exchange_counts(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT exchange, COUNT(*) AS n FROM companies GROUP BY exchange ORDER BY n DESC, exchange",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn get(&self, ticker: &str) -> Result<Option<CompanyRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT name, exchange, sector, market_cap, created_at, updated_at
                 FROM companies WHERE ticker = ?1",
                params![ticker],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((name, exchange, sector, market_cap, created_at, updated_at)) => Ok(Some(CompanyRecord {
                ticker: ticker.to_string(),
                name,
                exchange,
                sector,
                market_cap,
                created_at: parse_timestamp(ticker, created_at)?,
                updated_at: parse_timestamp(ticker, updated_at)?,
            })),
        }
    }
}

fn parse_timestamp(ticker: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match value {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| StoreError::Timestamp {
                ticker: ticker.to_string(),
                value: s,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use tickerbase_feed::model::{CandidateRecord, CompanyPatch, Field};

    fn created(ticker: &str, name: &str, sector: Option<&str>, market_cap: Option<f64>) -> Outcome {
        Outcome::Created {
            record: CandidateRecord {
                ticker: ticker.into(),
                name: name.into(),
                exchange: "NASDAQ".into(),
                sector: sector.map(Into::into),
                market_cap,
                country: "United States".into(),
                last_sale: None,
            },
        }
    }

    #[test]
    fn commit_inserts_and_loads() {
        let mut store = CompanyStore::open_in_memory().unwrap();
        let stats = store
            .commit(&[
                created("AAPL", "Apple", Some("Technology"), Some(3e12)),
                created("NOSEC", "Quiet Holdings", None, None),
                Outcome::Failed {
                    ticker: "brk".into(),
                    reason: "bad".into(),
                },
            ])
            .unwrap();
        assert_eq!(stats, CommitStats { inserted: 2, updated: 0 });

        let lookup = store.load_lookup().unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup["AAPL"].name, "Apple");
        assert_eq!(lookup["AAPL"].market_cap, Some(3e12));
        assert!(lookup["AAPL"].created_at.is_some());
        assert_eq!(lookup["AAPL"].updated_at, None);
        assert_eq!(lookup["NOSEC"].sector, None);
    }

    #[test]
    fn commit_applies_only_patched_fields() {
        let mut store = CompanyStore::open_in_memory().unwrap();
        store
            .commit(&[created("AAPL", "Apple", Some("Tech"), Some(2.9e12))])
            .unwrap();

        let now = Utc::now();
        let stats = store
            .commit(&[Outcome::Updated {
                ticker: "AAPL".into(),
                changed: vec![Field::Sector, Field::MarketCap],
                patch: CompanyPatch {
                    name: None,
                    sector: Some(Some("Technology".into())),
                    market_cap: Some(None),
                },
                updated_at: now,
            }])
            .unwrap();
        assert_eq!(stats.updated, 1);

        let aapl = store.get("AAPL").unwrap().unwrap();
        assert_eq!(aapl.name, "Apple");
        assert_eq!(aapl.sector.as_deref(), Some("Technology"));
        assert_eq!(aapl.market_cap, None);
        assert_eq!(
            aapl.updated_at.map(|t| t.timestamp_millis()),
            Some(now.timestamp_millis())
        );
    }

    #[test]
    fn failed_commit_rolls_back() {
        let mut store = CompanyStore::open_in_memory().unwrap();
        let err = store
            .commit(&[
                created("NEW", "New Co", None, None),
                Outcome::Updated {
                    ticker: "GHOST".into(),
                    changed: vec![Field::Name],
                    patch: CompanyPatch {
                        name: Some("Ghost".into()),
                        ..CompanyPatch::default()
                    },
                    updated_at: Utc::now(),
                },
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingCompany(ref t) if t == "GHOST"));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut store = CompanyStore::open_in_memory().unwrap();
        store.commit(&[created("AAPL", "Apple", None, None)]).unwrap();
        assert!(store.commit(&[created("AAPL", "Apple", None, None)]).is_err());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn counts_by_exchange() {
        let mut store = CompanyStore::open_in_memory().unwrap();
        let mut nyse = created("IBM", "International Business Machines", None, None);
        if let Outcome::Created { ref mut record } = nyse {
            record.exchange = "NYSE".into();
        }
        store
            .commit(&[created("AAPL", "Apple", None, None), created("MSFT", "Microsoft", None, None), nyse])
            .unwrap();

        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(store.count_by_exchange("NASDAQ").unwrap(), 2);
        assert_eq!(store.count_by_exchange("AMEX").unwrap(), 0);
        assert_eq!(
            store.exchange_counts().unwrap(),
            vec![("NASDAQ".to_string(), 2), ("NYSE".to_string(), 1)]
        );
    }

    #[test]
    fn persists_across_reopen() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let path = temp_file.path();

        {
            let mut store = CompanyStore::open(path).expect("open should succeed");
            store.commit(&[created("AAPL", "Apple", Some("Technology"), Some(3e12))]).unwrap();
        }

        let store = CompanyStore::open(path).expect("reopen should succeed");
        let lookup = store.load_lookup().unwrap();
        assert_eq!(lookup["AAPL"].sector.as_deref(), Some("Technology"));
        assert!(store.get("MSFT").unwrap().is_none());
    }

    #[test]
    fn read_only_open_never_creates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert!(matches!(CompanyStore::open_read_only(&path), Err(StoreError::Open { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn read_only_open_loads_but_rejects_commit() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let path = temp_file.path();
        {
            let mut store = CompanyStore::open(path).unwrap();
            store.commit(&[created("AAPL", "Apple", None, None)]).unwrap();
        }

        let mut store = CompanyStore::open_read_only(path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.load_lookup().unwrap().contains_key("AAPL"));
        assert!(store.commit(&[created("MSFT", "Microsoft", None, None)]).is_err());
    }
}
