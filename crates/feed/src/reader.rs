use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::filter::{ScopeFilter, SkipReason};
use crate::model::{CandidateRecord, RawRow};
use crate::normalize::normalize_market_cap;

/// Row accounting for one pass over a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadStats {
    /// Data rows seen, including unreadable ones.
    pub rows: usize,
    pub candidates: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl ReadStats {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}

/// An opened screener feed whose header row has been read.
pub struct FeedReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    filter: ScopeFilter,
    exchange: String,
}

impl FeedReader<File> {
    /// Open a feed file. A missing or unreadable file is fatal for the run.
    pub fn open(path: &Path, config: &FeedConfig, exchange: &str) -> Result<Self, FeedError> {
        let file = File::open(path).map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, config, exchange)
    }
}

impl<R: Read> FeedReader<R> {
    pub fn from_reader(rdr: R, config: &FeedConfig, exchange: &str) -> Result<Self, FeedError> {
        let filter = ScopeFilter::new(config)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(rdr);

        let headers: Vec<String> = reader
            .headers()
            .map_err(FeedError::Header)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        log::debug!("feed headers: {}", headers.join(", "));

        Ok(Self {
            reader,
            headers,
            filter,
            exchange: exchange.to_string(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Single pass over the remaining rows. A fresh read needs a fresh `FeedReader`.
    pub fn candidates(self) -> Candidates<R> {
        Candidates {
            reader: self.reader,
            headers: self.headers,
            filter: self.filter,
            exchange: self.exchange,
            record: csv::StringRecord::new(),
            stats: ReadStats::default(),
            done: false,
        }
    }
}

/// Open `path` and stream its in-scope candidates.
pub fn read_candidates(
    path: &Path,
    config: &FeedConfig,
    exchange: &str,
) -> Result<Candidates<File>, FeedError> {
    Ok(FeedReader::open(path, config, exchange)?.candidates())
}

/// Lazy sequence of candidates, one source row at a time.
pub struct Candidates<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    filter: ScopeFilter,
    exchange: String,
    record: csv::StringRecord,
    stats: ReadStats,
    done: bool,
}

impl<R: Read> Candidates<R> {
    /// Counts so far; final once the iterator returns `None`.
    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }

    fn raw_row(&self) -> RawRow {
        RawRow::new(
            self.headers
                .iter()
                .zip(self.record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect(),
        )
    }

    fn to_candidate(&self, row: &RawRow) -> CandidateRecord {
        let col = self.filter.columns();
        let normalizer = self.filter.normalizer();
        let last_sale = row.get(&col.last_sale).trim();

        CandidateRecord {
            ticker: row.get(&col.ticker).trim().to_string(),
            name: normalizer.normalize_name(row.get(&col.name)),
            exchange: self.exchange.clone(),
            sector: normalizer.normalize_sector(row.get(&col.sector)),
            market_cap: normalize_market_cap(row.get(&col.market_cap)),
            country: row.get(&col.country).trim().to_string(),
            last_sale: (!last_sale.is_empty()).then(|| last_sale.to_string()),
        }
    }
}

impl<R: Read> Iterator for Candidates<R> {
    type Item = CandidateRecord;

    fn next(&mut self) -> Option<CandidateRecord> {
        while !self.done {
            match self.reader.read_record(&mut self.record) {
                Ok(false) => self.done = true,
                Ok(true) => {
                    self.stats.rows += 1;
                    let row = self.raw_row();
                    if let Some(reason) = self.filter.skip_reason(&row) {
                        log::debug!(
                            "row {}: skipped ({reason}) {}",
                            self.stats.rows,
                            row.get(&self.filter.columns().ticker)
                        );
                        self.stats.skip(reason);
                        continue;
                    }
                    self.stats.candidates += 1;
                    return Some(self.to_candidate(&row));
                }
                Err(e) => {
                    self.stats.rows += 1;
                    self.stats.skip(SkipReason::Unreadable);
                    // An IO error means the stream itself is gone; stop rather than spin.
                    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                        log::warn!("feed read aborted: {e}");
                        self.done = true;
                    } else {
                        log::warn!("unreadable feed row: {e}");
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Symbol,Name,Last Sale,Net Change,% Change,Market Cap,Country,IPO Year,Volume,Sector,Industry\n";

    fn candidates(body: &str) -> Candidates<&[u8]> {
        FeedReader::from_reader(body.as_bytes(), &FeedConfig::default(), "NASDAQ")
            .unwrap()
            .candidates()
    }

    #[test]
    fn normalizes_and_filters() {
        let data = format!(
            "{HEADER}\
AAPL,Apple Inc. Common Stock,$227.48,1.2,0.5%,\"3,000,000,000,000.00\",United States,1980,100,Technology,Computer Manufacturing\n\
SHEL,Shell PLC American Depositary Shares,$70.00,0.1,0.1%,\"200,000,000,000.00\",United Kingdom,,50,Energy,Oil\n\
JPM,JPMorgan Chase & Co. Common Stock,$200.00,0.1,0.1%,0.00,United States,,50,Finance,Major Banks\n"
        );
        let mut iter = candidates(&data);
        let all: Vec<_> = iter.by_ref().collect();

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].ticker, "AAPL");
        assert_eq!(all[0].name, "Apple");
        assert_eq!(all[0].exchange, "NASDAQ");
        assert_eq!(all[0].sector.as_deref(), Some("Technology"));
        assert_eq!(all[0].market_cap, Some(3e12));
        assert_eq!(all[0].last_sale.as_deref(), Some("$227.48"));

        assert_eq!(all[1].ticker, "JPM");
        assert_eq!(all[1].name, "JPMorgan Chase & Co.");
        assert_eq!(all[1].sector.as_deref(), Some("Financial Services"));
        assert_eq!(all[1].market_cap, None);

        let stats = iter.stats();
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.candidates, 2);
        assert_eq!(stats.skipped_for(SkipReason::ForeignCountry), 1);
    }

    #[test]
    fn missing_columns_read_as_empty() {
        let data = "Symbol,Name,Country\nACME,Acme Inc.,US\n";
        let all: Vec<_> = candidates(data).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Acme");
        assert_eq!(all[0].sector, None);
        assert_eq!(all[0].market_cap, None);
        assert_eq!(all[0].last_sale, None);
    }

    #[test]
    fn short_rows_are_tolerated() {
        let data = format!("{HEADER}ACME,Acme Inc.\nBETA,Beta Corp.,$1.00,0,0%,\"1,000.00\",USA\n");
        let mut iter = candidates(&data);
        let all: Vec<_> = iter.by_ref().collect();
        // ACME has no country column value, so it is out of scope
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].ticker, "BETA");
        assert_eq!(all[0].market_cap, Some(1000.0));
        assert_eq!(iter.stats().skipped_for(SkipReason::ForeignCountry), 1);
    }

    #[test]
    fn bom_and_padded_headers() {
        let data = "\u{feff}Symbol , Name ,Country\nACME,Acme Inc.,US\n";
        let reader = FeedReader::from_reader(data.as_bytes(), &FeedConfig::default(), "NYSE").unwrap();
        assert_eq!(reader.headers()[0], "Symbol");
        assert_eq!(reader.headers()[1], "Name");
        let all: Vec<_> = reader.candidates().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].exchange, "NYSE");
    }

    #[test]
    fn invalid_utf8_row_is_skipped() {
        let mut data = b"Symbol,Name,Country\n".to_vec();
        data.extend_from_slice(b"BAD,Bad \xff Name,US\n");
        data.extend_from_slice(b"GOOD,Good Inc.,US\n");
        let mut iter = FeedReader::from_reader(data.as_slice(), &FeedConfig::default(), "NASDAQ")
            .unwrap()
            .candidates();
        let all: Vec<_> = iter.by_ref().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].ticker, "GOOD");
        assert_eq!(iter.stats().skipped_for(SkipReason::Unreadable), 1);
        assert_eq!(iter.stats().rows, 2);
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = read_candidates(Path::new("/nonexistent/screener.csv"), &FeedConfig::default(), "NASDAQ")
            .err()
            .unwrap();
        assert!(matches!(err, FeedError::Open { .. }));
    }
}
