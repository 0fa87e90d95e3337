//! Output module for run summaries and dataset reports
//!
//! This module handles:
//! - Per-site reports and the end-of-run summary log
//! - Offline statistics over stored datasets

pub mod stats;
mod summary;

pub use stats::{compute_statistics, load_statistics, print_statistics, DatasetStatistics};
pub use summary::{log_summary, RunSummary, SiteFailure, SiteReport};
