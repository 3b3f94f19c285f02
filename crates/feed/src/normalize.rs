//! Field cleaning for raw screener text.
//!
//! Nothing here fails: text that cannot be interpreted degrades to `None`
//! (unknown) or passes through unchanged.

use std::collections::{BTreeMap, HashSet};

use crate::config::{FeedConfig, SuffixMode};

/// Characters removed from market-cap text before parsing.
const MARKET_CAP_NOISE: &[char] = &[',', '$', '€', '£', '¥'];

/// Parse a currency/comma formatted market cap.
///
/// `None` for empty text, the literal `0.00` placeholder, anything that is not
/// a finite number, and negative values.
pub fn normalize_market_cap(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| !MARKET_CAP_NOISE.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "0.00" {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        _ => None,
    }
}

/// Table-driven cleaner for names, sectors and countries.
#[derive(Debug, Clone)]
pub struct Normalizer {
    suffixes: Vec<String>,
    mode: SuffixMode,
    sector_map: BTreeMap<String, String>,
    domestic: HashSet<String>,
}

impl Normalizer {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            suffixes: config.name_suffixes.clone(),
            mode: config.suffix_mode,
            sector_map: config.sector_map.clone(),
            domestic: config.domestic_countries.iter().cloned().collect(),
        }
    }

    /// Trim, then strip trailing corporate/security-type suffixes in list order.
    ///
    /// Each suffix is tried once, against the name as left by earlier strips.
    /// In `FirstMatch` mode the walk stops after the first strip.
    pub fn normalize_name(&self, text: &str) -> String {
        let mut name = text.trim();
        for suffix in &self.suffixes {
            if let Some(stripped) = name.strip_suffix(suffix.as_str()) {
                name = stripped.trim();
                if self.mode == SuffixMode::FirstMatch {
                    break;
                }
            }
        }
        name.to_string()
    }

    /// Canonical sector name; unmapped values pass through trimmed.
    pub fn normalize_sector(&self, text: &str) -> Option<String> {
        let sector = text.trim();
        if sector.is_empty() {
            return None;
        }
        Some(
            self.sector_map
                .get(sector)
                .cloned()
                .unwrap_or_else(|| sector.to_string()),
        )
    }

    /// Exact, case-sensitive match of the trimmed value against the accepted spellings.
    pub fn is_domestic_country(&self, text: &str) -> bool {
        self.domestic.contains(text.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(&FeedConfig::default())
    }

    #[test]
    fn market_cap_formats() {
        assert_eq!(normalize_market_cap("1,234,567.00"), Some(1234567.0));
        assert_eq!(normalize_market_cap(" $3,000,000,000,000.00 "), Some(3e12));
        assert_eq!(normalize_market_cap("42"), Some(42.0));
    }

    #[test]
    fn market_cap_unknowns() {
        assert_eq!(normalize_market_cap(""), None);
        assert_eq!(normalize_market_cap("   "), None);
        assert_eq!(normalize_market_cap("0.00"), None);
        assert_eq!(normalize_market_cap("n/a"), None);
        assert_eq!(normalize_market_cap("inf"), None);
        assert_eq!(normalize_market_cap("NaN"), None);
        assert_eq!(normalize_market_cap("-5.00"), None);
    }

    #[test]
    fn name_single_suffix() {
        let n = normalizer();
        assert_eq!(n.normalize_name("Foo Inc."), "Foo");
        assert_eq!(n.normalize_name("  Bar Holdings LLC  "), "Bar Holdings");
        assert_eq!(n.normalize_name("Plain Name"), "Plain Name");
        assert_eq!(n.normalize_name(""), "");
    }

    #[test]
    fn name_ordered_pass_strips_stacked_suffixes() {
        let n = normalizer();
        assert_eq!(n.normalize_name("Apple Inc. Common Stock"), "Apple");
        // " Common Stock" is tried before " Class A Common Stock"
        assert_eq!(n.normalize_name("Alphabet Inc. Class A Common Stock"), "Alphabet Inc. Class A");
    }

    #[test]
    fn name_suffix_must_trail() {
        let n = normalizer();
        assert_eq!(n.normalize_name("Inc. Research Group"), "Inc. Research Group");
        assert_eq!(n.normalize_name("Acme Corp.s"), "Acme Corp.s");
    }

    #[test]
    fn name_first_match_mode() {
        let config = FeedConfig {
            suffix_mode: SuffixMode::FirstMatch,
            ..FeedConfig::default()
        };
        let n = Normalizer::new(&config);
        assert_eq!(n.normalize_name("Apple Inc. Common Stock"), "Apple Inc.");
        assert_eq!(n.normalize_name("Foo Inc."), "Foo");
    }

    #[test]
    fn sector_mapping() {
        let n = normalizer();
        assert_eq!(n.normalize_sector("Finance").as_deref(), Some("Financial Services"));
        assert_eq!(n.normalize_sector(" Health Care ").as_deref(), Some("Healthcare"));
        assert_eq!(n.normalize_sector("Miscellaneous").as_deref(), Some("Miscellaneous"));
        assert_eq!(n.normalize_sector(""), None);
        assert_eq!(n.normalize_sector("  "), None);
    }

    #[test]
    fn domestic_spellings_are_literal() {
        let n = normalizer();
        for spelling in ["United States", "USA", "US", "U.S.", "U.S.A.", "United States of America"] {
            assert!(n.is_domestic_country(spelling), "{spelling}");
        }
        assert!(n.is_domestic_country("  US "));
        assert!(!n.is_domestic_country("us"));
        assert!(!n.is_domestic_country("United states"));
        assert!(!n.is_domestic_country("Canada"));
        assert!(!n.is_domestic_country(""));
    }
}
