use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::config::{ColumnMapping, FeedConfig};
use crate::error::FeedError;
use crate::model::RawRow;
use crate::normalize::Normalizer;

/// Why a row was dropped before reconciliation. Routine filtering, not failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingTicker,
    MissingName,
    ForeignCountry,
    NonEquity,
    Unreadable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTicker => write!(f, "missing_ticker"),
            Self::MissingName => write!(f, "missing_name"),
            Self::ForeignCountry => write!(f, "foreign_country"),
            Self::NonEquity => write!(f, "non_equity"),
            Self::Unreadable => write!(f, "unreadable"),
        }
    }
}

/// Decides which raw rows are in-scope domestic equities.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    columns: ColumnMapping,
    normalizer: Normalizer,
    excluded: Vec<Regex>,
}

impl ScopeFilter {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let excluded = config
            .excluded_name_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        FeedError::ConfigValidation(format!(
                            "bad exclusion pattern '{pattern}': {e}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            columns: config.columns.clone(),
            normalizer: Normalizer::new(config),
            excluded,
        })
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn is_in_scope(&self, row: &RawRow) -> bool {
        self.skip_reason(row).is_none()
    }

    /// First failed check, in order: ticker, name, country, non-equity name.
    pub fn skip_reason(&self, row: &RawRow) -> Option<SkipReason> {
        if row.get(&self.columns.ticker).trim().is_empty() {
            return Some(SkipReason::MissingTicker);
        }

        let raw_name = row.get(&self.columns.name).trim();
        let name = self.normalizer.normalize_name(raw_name);
        if name.is_empty() {
            return Some(SkipReason::MissingName);
        }

        if !self.normalizer.is_domestic_country(row.get(&self.columns.country)) {
            return Some(SkipReason::ForeignCountry);
        }

        // The raw name is checked too: "XYZ Warrants" cleans to "XYZ".
        if self.is_non_equity_name(raw_name) || self.is_non_equity_name(&name) {
            return Some(SkipReason::NonEquity);
        }

        None
    }

    pub fn is_non_equity_name(&self, name: &str) -> bool {
        self.excluded.iter().any(|re| re.is_match(name))
    }
}
