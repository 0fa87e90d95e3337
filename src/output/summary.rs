//! Per-site reports and the run-level summary

use crate::state::{CrawlMode, SiteStage, StopReason};
use chrono::{DateTime, Utc};

/// What happened to one site during a run
#[derive(Debug, Clone, PartialEq)]
pub struct SiteReport {
    pub site: String,
    pub mode: CrawlMode,

    /// Pages the site reported through `X-WP-TotalPages`
    pub total_pages: u32,
    pub pages_requested: u32,
    pub pages_failed: u32,
    pub stop: StopReason,

    /// Raw posts that came back from pagination
    pub posts_fetched: usize,
    pub articles_parsed: usize,

    /// Articles actually appended to the dataset
    pub new_articles: usize,

    /// Size of the dataset after this run
    pub dataset_size: usize,
}

/// A site whose pipeline failed
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFailure {
    pub site: String,
    pub stage: Option<SiteStage>,
    pub error: String,
}

/// Outcome of a whole run over the configured sites
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_sites: usize,
    pub reports: Vec<SiteReport>,
    pub failures: Vec<SiteFailure>,
}

impl RunSummary {
    pub fn new(total_sites: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            total_sites,
            reports: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_success(&mut self, report: SiteReport) {
        self.reports.push(report);
    }

    pub fn record_failure(&mut self, site: &str, error: &crate::HarvestError) {
        self.failures.push(SiteFailure {
            site: site.to_string(),
            stage: error.stage(),
            error: error.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Number of sites that completed their pipeline
    pub fn successful(&self) -> usize {
        self.reports.len()
    }

    pub fn failed_sites(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.site.as_str()).collect()
    }

    /// Articles appended across all sites
    pub fn new_articles(&self) -> usize {
        self.reports.iter().map(|r| r.new_articles).sum()
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Logs the end-of-run summary
pub fn log_summary(summary: &RunSummary) {
    tracing::info!("=== Summary ===");
    tracing::info!(
        "Successfully scraped: {}/{} sites",
        summary.successful(),
        summary.total_sites
    );

    for report in &summary.reports {
        tracing::info!(
            "  {}: {} new articles ({} mode, {} of {} pages, stopped: {}), dataset size {}",
            report.site,
            report.new_articles,
            report.mode,
            report.pages_requested,
            report.total_pages,
            report.stop,
            report.dataset_size
        );
    }

    if !summary.failures.is_empty() {
        tracing::warn!("Failed sites: {}", summary.failed_sites().join(", "));
        for failure in &summary.failures {
            tracing::warn!("  {}: {}", failure.site, failure.error);
        }
    }

    if let Some(seconds) = summary.duration_seconds() {
        tracing::info!(
            "Appended {} articles in {}s",
            summary.new_articles(),
            seconds
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HarvestError;

    fn report(site: &str, new_articles: usize) -> SiteReport {
        SiteReport {
            site: site.to_string(),
            mode: CrawlMode::Incremental,
            total_pages: 3,
            pages_requested: 2,
            pages_failed: 0,
            stop: StopReason::ReachedSeenContent { page: 2 },
            posts_fetched: new_articles,
            articles_parsed: new_articles,
            new_articles,
            dataset_size: 10 + new_articles,
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new(3);
        summary.record_success(report("kurir.mk", 4));
        summary.record_success(report("sdk.mk", 1));

        let error = HarvestError::at(
            SiteStage::MergeAndPersist,
            HarvestError::Interrupted {
                site: "a1on.mk".to_string(),
            },
        );
        summary.record_failure("a1on.mk", &error);
        summary.finish();

        assert_eq!(summary.successful(), 2);
        assert_eq!(summary.failed_sites(), vec!["a1on.mk"]);
        assert_eq!(summary.failures[0].stage, Some(SiteStage::MergeAndPersist));
        assert_eq!(summary.new_articles(), 5);
        assert!(summary.duration_seconds().is_some());
    }

    #[test]
    fn test_unfinished_summary_has_no_duration() {
        assert_eq!(RunSummary::new(1).duration_seconds(), None);
    }
}
