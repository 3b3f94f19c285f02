use std::collections::HashMap;

use chrono::Utc;

use crate::config::FeedConfig;
use crate::model::{CandidateRecord, CompanyRecord, Outcome, RunMeta, RunResult};
use crate::reconcile::{apply_outcome, Reconciler};
use crate::report::RunReport;

/// Reconcile candidates in source order against `lookup`.
///
/// Each outcome is applied to `lookup` before the next candidate is looked at,
/// so the lookup ends the run holding the post-import state. A `Failed`
/// candidate only affects its own ticker.
pub fn run(
    config: &FeedConfig,
    exchange: &str,
    candidates: impl IntoIterator<Item = CandidateRecord>,
    lookup: &mut HashMap<String, CompanyRecord>,
) -> RunResult {
    let reconciler = Reconciler::new(config);
    let mut report = RunReport::new();
    let mut outcomes = Vec::new();
    let run_at = Utc::now();

    log::info!(
        "reconciling {exchange} feed against {} existing companies",
        lookup.len()
    );

    for candidate in candidates {
        let now = Utc::now();
        let outcome = reconciler.reconcile_at(&candidate, lookup, now);
        match &outcome {
            Outcome::Failed { ticker, reason } => log::warn!("{ticker}: {reason}"),
            Outcome::Updated { ticker, changed, .. } => {
                let fields: Vec<String> = changed.iter().map(|f| f.to_string()).collect();
                log::debug!("{ticker}: updated {}", fields.join(", "));
            }
            _ => {}
        }
        apply_outcome(&outcome, lookup, now);
        report.record_outcome(&outcome);
        outcomes.push(outcome);
    }

    let summary = report.into_summary();
    log::info!(
        "run complete: {} total, {} created, {} updated, {} unchanged, {} failed",
        summary.total,
        summary.created,
        summary.updated,
        summary.unchanged,
        summary.failed,
    );

    RunResult {
        meta: RunMeta {
            exchange: exchange.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: run_at.to_rfc3339(),
        },
        summary,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(ticker: &str, name: &str) -> CandidateRecord {
        CandidateRecord {
            ticker: ticker.into(),
            name: name.into(),
            exchange: "NASDAQ".into(),
            sector: None,
            market_cap: None,
            country: "US".into(),
            last_sale: None,
        }
    }

    #[test]
    fn duplicate_ticker_in_one_feed() {
        let mut lookup = HashMap::new();
        let result = run(
            &FeedConfig::default(),
            "NASDAQ",
            vec![candidate("DUP", "First"), candidate("DUP", "Second"), candidate("DUP", "Second")],
            &mut lookup,
        );
        assert_eq!(result.summary.created, 1);
        assert_eq!(result.summary.updated, 1);
        assert_eq!(result.summary.unchanged, 1);
        assert_eq!(lookup["DUP"].name, "Second");
    }

    #[test]
    fn meta_carries_exchange() {
        let result = run(&FeedConfig::default(), "NYSE", Vec::new(), &mut HashMap::new());
        assert_eq!(result.meta.exchange, "NYSE");
        assert_eq!(result.summary.total, 0);
        assert!(result.outcomes.is_empty());
    }
}
