//! `tickerbase-feed` - listing feed ingestion and company reconciliation.
//!
//! Pure engine crate: reads a screener CSV into normalized candidates and
//! classifies each one against a pre-loaded lookup of existing companies.
//! No database or terminal IO; persistence and reporting belong to the caller.

pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod reconcile;
pub mod report;

pub use config::FeedConfig;
pub use error::FeedError;
pub use model::{CandidateRecord, CompanyRecord, Outcome, RunResult, RunSummary};
pub use pipeline::run;
pub use reader::FeedReader;
