use std::collections::BTreeMap;
use std::path::Path;

use regex::RegexBuilder;
use serde::Deserialize;

use crate::error::FeedError;

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// Corporate / security-type suffixes, in priority order.
pub const DEFAULT_NAME_SUFFIXES: &[&str] = &[
    " Common Stock",
    " Class A Common Stock",
    " Class B Common Stock",
    " Ordinary Shares",
    " American Depositary Shares",
    " Depositary Shares",
    " Units",
    " Rights",
    " Warrants",
    " Class A Ordinary Shares",
    " Class B Ordinary Shares",
    " Inc.",
    " Corporation",
    " Corp.",
    " Limited",
    " Ltd.",
    " LLC",
    " PLC",
];

pub const DEFAULT_SECTOR_MAP: &[(&str, &str)] = &[
    ("Technology", "Technology"),
    ("Industrials", "Industrials"),
    ("Finance", "Financial Services"),
    ("Health Care", "Healthcare"),
    ("Consumer Discretionary", "Consumer Discretionary"),
    ("Consumer Staples", "Consumer Staples"),
    ("Real Estate", "Real Estate"),
    ("Energy", "Energy"),
    ("Utilities", "Utilities"),
    ("Basic Materials", "Basic Materials"),
    ("Communication Services", "Communication Services"),
];

pub const DEFAULT_DOMESTIC_COUNTRIES: &[&str] = &[
    "United States",
    "USA",
    "US",
    "U.S.",
    "U.S.A.",
    "United States of America",
];

/// Non-equity name patterns. Matched case-insensitively.
pub const DEFAULT_EXCLUDED_NAME_PATTERNS: &[&str] = &[
    r"Rights$",
    r"Warrants?$",
    r"Units$",
    r"Notes?$",
    r"Bond$",
    r"Preferred$",
    r"Series \w+$",
];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Lookup tables and column names for one feed format.
///
/// Every field has a default, so an empty TOML document yields the built-in
/// NASDAQ screener layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub columns: ColumnMapping,
    pub name_suffixes: Vec<String>,
    pub suffix_mode: SuffixMode,
    pub sector_map: BTreeMap<String, String>,
    pub domestic_countries: Vec<String>,
    pub excluded_name_patterns: Vec<String>,
    pub limits: FieldLimits,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            name_suffixes: DEFAULT_NAME_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            suffix_mode: SuffixMode::default(),
            sector_map: DEFAULT_SECTOR_MAP
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            domestic_countries: DEFAULT_DOMESTIC_COUNTRIES.iter().map(|s| s.to_string()).collect(),
            excluded_name_patterns: DEFAULT_EXCLUDED_NAME_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            limits: FieldLimits::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub ticker: String,
    pub name: String,
    pub last_sale: String,
    pub market_cap: String,
    pub sector: String,
    pub country: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            ticker: "Symbol".into(),
            name: "Name".into(),
            last_sale: "Last Sale".into(),
            market_cap: "Market Cap".into(),
            sector: "Sector".into(),
            country: "Country".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Suffix mode + limits
// ---------------------------------------------------------------------------

/// How `name_suffixes` is applied to a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixMode {
    /// Walk the list once; strip each suffix at most once if it trails the name so far.
    #[default]
    OrderedPass,
    /// Strip only the first suffix in list order that trails the name.
    FirstMatch,
}

/// Storage column limits. Candidates exceeding them fail reconciliation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldLimits {
    pub ticker_max_len: usize,
    pub name_max_len: usize,
    pub sector_max_len: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            ticker_max_len: 10,
            name_max_len: 255,
            sector_max_len: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl FeedConfig {
    pub fn from_toml(input: &str) -> Result<Self, FeedError> {
        let config: FeedConfig =
            toml::from_str(input).map_err(|e| FeedError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, FeedError> {
        let input = std::fs::read_to_string(path).map_err(|source| FeedError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), FeedError> {
        let col = &self.columns;
        for (field, value) in [
            ("ticker", &col.ticker),
            ("name", &col.name),
            ("last_sale", &col.last_sale),
            ("market_cap", &col.market_cap),
            ("sector", &col.sector),
            ("country", &col.country),
        ] {
            if value.trim().is_empty() {
                return Err(FeedError::ConfigValidation(format!(
                    "columns.{field} must not be empty"
                )));
            }
        }

        if self.domestic_countries.is_empty() {
            return Err(FeedError::ConfigValidation(
                "domestic_countries must list at least one spelling".into(),
            ));
        }

        if let Some(pos) = self.name_suffixes.iter().position(|s| s.trim().is_empty()) {
            return Err(FeedError::ConfigValidation(format!(
                "name_suffixes[{pos}] is empty"
            )));
        }

        for pattern in &self.excluded_name_patterns {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    FeedError::ConfigValidation(format!("bad exclusion pattern '{pattern}': {e}"))
                })?;
        }

        if self.limits.ticker_max_len == 0 || self.limits.name_max_len == 0 {
            return Err(FeedError::ConfigValidation(
                "limits must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
