use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One source line, keyed by header name. Lives only while the row is processed.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Field value by header name. Missing columns read as empty.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// A normalized, in-scope row ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub ticker: String,
    pub name: String,
    pub exchange: String,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    /// Informational only; never persisted.
    pub country: String,
    /// Raw last-sale text, carried for previews only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sale: Option<String>,
}

// ---------------------------------------------------------------------------
// Persisted state
// ---------------------------------------------------------------------------

/// A company as held by the persistence layer, keyed by `ticker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub ticker: String,
    pub name: String,
    pub exchange: String,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CompanyRecord {
    pub fn from_candidate(candidate: &CandidateRecord, now: DateTime<Utc>) -> Self {
        Self {
            ticker: candidate.ticker.clone(),
            name: candidate.name.clone(),
            exchange: candidate.exchange.clone(),
            sector: candidate.sector.clone(),
            market_cap: candidate.market_cap,
            created_at: Some(now),
            updated_at: None,
        }
    }

    /// Apply the changed fields of `patch` and stamp `updated_at`.
    pub fn apply_patch(&mut self, patch: &CompanyPatch, now: DateTime<Utc>) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(ref sector) = patch.sector {
            self.sector = sector.clone();
        }
        if let Some(market_cap) = patch.market_cap {
            self.market_cap = market_cap;
        }
        self.updated_at = Some(now);
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Business fields the feed is allowed to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Sector,
    MarketCap,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Sector => write!(f, "sector"),
            Self::MarketCap => write!(f, "market_cap"),
        }
    }
}

/// New values for the fields that differ. `None` = field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Option<f64>>,
}

impl CompanyPatch {
    /// Changed field names, in fixed name/sector/market_cap order.
    pub fn changed_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(Field::Name);
        }
        if self.sector.is_some() {
            fields.push(Field::Sector);
        }
        if self.market_cap.is_some() {
            fields.push(Field::MarketCap);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.sector.is_none() && self.market_cap.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Created {
        record: CandidateRecord,
    },
    Updated {
        ticker: String,
        changed: Vec<Field>,
        patch: CompanyPatch,
        updated_at: DateTime<Utc>,
    },
    Unchanged {
        ticker: String,
    },
    Failed {
        ticker: String,
        reason: String,
    },
}

impl Outcome {
    pub fn ticker(&self) -> &str {
        match self {
            Self::Created { record } => &record.ticker,
            Self::Updated { ticker, .. } | Self::Unchanged { ticker } | Self::Failed { ticker, .. } => {
                ticker
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// `Error processing <ticker>: <reason>`, in source order.
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub exchange: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub outcomes: Vec<Outcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_reads_empty() {
        let row = RawRow::from_pairs([("Symbol", "AAPL")]);
        assert_eq!(row.get("Symbol"), "AAPL");
        assert_eq!(row.get("Sector"), "");
    }

    #[test]
    fn patch_lists_changed_fields_in_order() {
        let patch = CompanyPatch {
            name: None,
            sector: Some(Some("Technology".into())),
            market_cap: Some(None),
        };
        assert_eq!(patch.changed_fields(), vec![Field::Sector, Field::MarketCap]);
        assert!(!patch.is_empty());
        assert!(CompanyPatch::default().is_empty());
    }

    #[test]
    fn apply_patch_touches_only_changed_fields() {
        let now = Utc::now();
        let mut record = CompanyRecord {
            ticker: "AAPL".into(),
            name: "Apple".into(),
            exchange: "NASDAQ".into(),
            sector: Some("Tech".into()),
            market_cap: Some(2.9e12),
            created_at: None,
            updated_at: None,
        };
        let patch = CompanyPatch {
            name: None,
            sector: None,
            market_cap: Some(None),
        };
        record.apply_patch(&patch, now);
        assert_eq!(record.name, "Apple");
        assert_eq!(record.sector.as_deref(), Some("Tech"));
        assert_eq!(record.market_cap, None);
        assert_eq!(record.updated_at, Some(now));
    }
}
