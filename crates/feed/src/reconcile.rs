use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::{FeedConfig, FieldLimits};
use crate::model::{CandidateRecord, CompanyPatch, CompanyRecord, Outcome};

/// Classifies candidates against the existing companies.
///
/// Never mutates the lookup: the returned `Outcome` carries everything the
/// caller needs to apply the change (see [`apply_outcome`]).
#[derive(Debug, Clone)]
pub struct Reconciler {
    limits: FieldLimits,
}

impl Reconciler {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            limits: config.limits.clone(),
        }
    }

    pub fn reconcile(
        &self,
        candidate: &CandidateRecord,
        existing: &HashMap<String, CompanyRecord>,
    ) -> Outcome {
        self.reconcile_at(candidate, existing, Utc::now())
    }

    /// `now` becomes the `updated_at` of an `Updated` outcome.
    pub fn reconcile_at(
        &self,
        candidate: &CandidateRecord,
        existing: &HashMap<String, CompanyRecord>,
        now: DateTime<Utc>,
    ) -> Outcome {
        if let Err(reason) = validate_candidate(candidate, &self.limits) {
            return Outcome::Failed {
                ticker: candidate.ticker.clone(),
                reason,
            };
        }

        let Some(record) = existing.get(&candidate.ticker) else {
            return Outcome::Created {
                record: candidate.clone(),
            };
        };

        let patch = diff_record(record, candidate);
        if patch.is_empty() {
            Outcome::Unchanged {
                ticker: candidate.ticker.clone(),
            }
        } else {
            Outcome::Updated {
                ticker: candidate.ticker.clone(),
                changed: patch.changed_fields(),
                patch,
                updated_at: now,
            }
        }
    }
}

/// Exact field-by-field comparison of name, sector and market cap.
///
/// `exchange` is fixed per run and `country` is not persisted, so neither is compared.
/// Market caps compare with `==`: both sides come from the same normalized form.
pub fn diff_record(record: &CompanyRecord, candidate: &CandidateRecord) -> CompanyPatch {
    CompanyPatch {
        name: (record.name != candidate.name).then(|| candidate.name.clone()),
        sector: (record.sector != candidate.sector).then(|| candidate.sector.clone()),
        market_cap: (record.market_cap != candidate.market_cap).then_some(candidate.market_cap),
    }
}

/// Apply an outcome to the in-memory lookup.
///
/// `Created` inserts a new record so later duplicates of the ticker in the same
/// run reconcile against it; `Updated` patches in place. Other outcomes are no-ops.
pub fn apply_outcome(outcome: &Outcome, lookup: &mut HashMap<String, CompanyRecord>, now: DateTime<Utc>) {
    match outcome {
        Outcome::Created { record } => {
            lookup.insert(record.ticker.clone(), CompanyRecord::from_candidate(record, now));
        }
        Outcome::Updated {
            ticker,
            patch,
            updated_at,
            ..
        } => match lookup.get_mut(ticker) {
            Some(existing) => existing.apply_patch(patch, *updated_at),
            None => log::warn!("update for {ticker} has no record in the lookup"),
        },
        Outcome::Unchanged { .. } | Outcome::Failed { .. } => {}
    }
}

/// Checks a candidate against the storage constraints.
pub fn validate_candidate(candidate: &CandidateRecord, limits: &FieldLimits) -> Result<(), String> {
    let ticker = &candidate.ticker;
    if ticker.is_empty() {
        return Err("ticker is empty".into());
    }
    if !ticker.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(format!("ticker '{ticker}' must be uppercase alphanumeric"));
    }
    if ticker.chars().count() > limits.ticker_max_len {
        return Err(format!(
            "ticker '{ticker}' exceeds {} characters",
            limits.ticker_max_len
        ));
    }

    if candidate.name.is_empty() {
        return Err("name is empty".into());
    }
    if candidate.name.chars().count() > limits.name_max_len {
        return Err(format!("name exceeds {} characters", limits.name_max_len));
    }

    if let Some(ref sector) = candidate.sector {
        if sector.chars().count() > limits.sector_max_len {
            return Err(format!(
                "sector '{sector}' exceeds {} characters",
                limits.sector_max_len
            ));
        }
    }

    if let Some(market_cap) = candidate.market_cap {
        if !market_cap.is_finite() || market_cap < 0.0 {
            return Err(format!("market cap {market_cap} is not a finite non-negative number"));
        }
    }

    Ok(())
}
