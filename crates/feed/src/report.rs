use crate::model::{Outcome, RunSummary};

/// Per-run outcome accumulator. Owned by the caller; one per run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    created: usize,
    updated: usize,
    unchanged: usize,
    failures: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created { .. } => self.created += 1,
            Outcome::Updated { .. } => self.updated += 1,
            Outcome::Unchanged { .. } => self.unchanged += 1,
            Outcome::Failed { ticker, reason } => {
                self.failures.push(format_failure(ticker, reason));
            }
        }
    }

    pub fn summarize(&self) -> RunSummary {
        let failed = self.failures.len();
        RunSummary {
            total: self.created + self.updated + self.unchanged + failed,
            created: self.created,
            updated: self.updated,
            unchanged: self.unchanged,
            failed,
            failures: self.failures.clone(),
        }
    }

    pub fn into_summary(self) -> RunSummary {
        self.summarize()
    }
}

pub fn format_failure(ticker: &str, reason: &str) -> String {
    format!("Error processing {ticker}: {reason}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CandidateRecord, CompanyPatch};

    fn created(ticker: &str) -> Outcome {
        Outcome::Created {
            record: CandidateRecord {
                ticker: ticker.into(),
                name: ticker.into(),
                exchange: "NASDAQ".into(),
                sector: None,
                market_cap: None,
                country: "US".into(),
                last_sale: None,
            },
        }
    }

    #[test]
    fn summary_counts() {
        let mut report = RunReport::new();
        report.record_outcome(&created("A"));
        report.record_outcome(&created("B"));
        report.record_outcome(&Outcome::Updated {
            ticker: "C".into(),
            changed: vec![],
            patch: CompanyPatch::default(),
            updated_at: chrono::Utc::now(),
        });
        report.record_outcome(&Outcome::Unchanged { ticker: "D".into() });
        report.record_outcome(&Outcome::Failed {
            ticker: "e".into(),
            reason: "ticker 'e' must be uppercase alphanumeric".into(),
        });
        report.record_outcome(&Outcome::Failed {
            ticker: "F".into(),
            reason: "name is empty".into(),
        });

        let summary = report.summarize();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(
            summary.failures,
            vec![
                "Error processing e: ticker 'e' must be uppercase alphanumeric".to_string(),
                "Error processing F: name is empty".to_string(),
            ]
        );
    }

    #[test]
    fn empty_run() {
        let summary = RunReport::new().into_summary();
        assert_eq!(summary, RunSummary::default());
    }
}
