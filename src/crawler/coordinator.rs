//! Harvest coordinator - per-site orchestration
//!
//! Sites are processed one at a time. For each site the coordinator:
//! - Loads the stored ids and picks the crawl mode
//! - Resolves the category map and the total page count
//! - Paginates the posts endpoint in the chosen mode
//! - Parses, filters and appends the new articles
//! - Reports the final dataset size
//!
//! A failing site is recorded and the run moves on. A shutdown signal ends
//! the run at once.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::metadata::{fetch_category_map, fetch_total_pages};
use crate::crawler::parser::parse_posts;
use crate::crawler::scheduler::{PostsEndpoint, Scheduler};
use crate::output::{log_summary, RunSummary, SiteReport};
use crate::state::{CrawlMode, SiteStage};
use crate::storage::{filter_new, DatasetStore, JsonFileStore};
use crate::url::{site_key, SiteEndpoints};
use crate::HarvestError;
use std::future::Future;
use std::sync::Arc;

/// Main harvest coordinator
///
/// Holds the immutable configuration and the dataset store. The HTTP client
/// is not kept here; each site gets its own for the duration of its run.
pub struct Coordinator<S: DatasetStore> {
    config: Arc<Config>,
    store: S,
    scheduler: Scheduler,
}

impl Coordinator<JsonFileStore> {
    /// Creates a coordinator writing JSON datasets under `output.data-dir`
    pub fn with_json_store(config: Config) -> Self {
        let store = JsonFileStore::new(config.output.data_dir.clone());
        Self::new(config, store)
    }
}

impl<S: DatasetStore> Coordinator<S> {
    pub fn new(config: impl Into<Arc<Config>>, store: S) -> Self {
        let config = config.into();
        let scheduler = Scheduler::from_config(&config.harvester);
        Self {
            config,
            store,
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Harvests every configured site
    pub async fn run(&self) -> Result<RunSummary, HarvestError> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Harvests every configured site, stopping as soon as `shutdown` completes
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - All sites were attempted; some may have failed
    /// * `Err(HarvestError::Interrupted)` - `shutdown` fired; nothing more of
    ///   the current site is written
    pub async fn run_with_shutdown<F>(&self, shutdown: F) -> Result<RunSummary, HarvestError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let sites = &self.config.sites;
        let mut summary = RunSummary::new(sites.len());
        tracing::info!("Starting harvest of {} sites", sites.len());

        for entry in sites {
            let site = entry.domain.as_str();
            tracing::info!("Processing site: {}", site);

            let result = tokio::select! {
                biased;

                _ = &mut shutdown => {
                    tracing::warn!("Harvest interrupted while processing {}", site);
                    return Err(HarvestError::Interrupted {
                        site: site.to_string(),
                    });
                }
                result = self.harvest_site(site) => result,
            };

            match result {
                Ok(report) => {
                    tracing::info!(
                        "Finished {}: {} new articles, {} total",
                        site,
                        report.new_articles,
                        report.dataset_size
                    );
                    summary.record_success(report);
                }
                Err(e) => {
                    tracing::error!("Error processing {}: {}", site, e);
                    summary.record_failure(site, &e);
                }
            }
        }

        summary.finish();
        log_summary(&summary);
        Ok(summary)
    }

    /// Runs the full pipeline for one site
    pub async fn harvest_site(&self, site: &str) -> Result<SiteReport, HarvestError> {
        let harvester = &self.config.harvester;

        let endpoints =
            SiteEndpoints::for_site(site).map_err(|e| HarvestError::at(SiteStage::ResolveMetadata, e))?;
        let key = site_key(site);

        let existing_ids = self
            .store
            .existing_ids(&key)
            .map_err(|e| HarvestError::at(SiteStage::ResolveMetadata, e))?;
        let mode = CrawlMode::for_existing(&existing_ids);
        match mode {
            CrawlMode::FirstRun => tracing::info!("First run for {}: fetching all pages", site),
            CrawlMode::Incremental => tracing::info!(
                "Incremental run for {}: {} articles already stored",
                site,
                existing_ids.len()
            ),
        }

        // The client lives for this block only
        let (categories, total_pages, crawl) = {
            let fetcher = Fetcher::from_config(&self.config)
                .map_err(|e| HarvestError::at(SiteStage::ResolveMetadata, e))?;

            let categories =
                fetch_category_map(&fetcher, &endpoints.categories, harvester.category_page_size).await;

            let total_pages =
                fetch_total_pages(&fetcher, &endpoints.posts, harvester.posts_per_page).await;

            let source = PostsEndpoint::new(&fetcher, &endpoints.posts, harvester.posts_per_page);
            let crawl = self
                .scheduler
                .run(&source, total_pages, mode, &existing_ids)
                .await;

            (categories, total_pages, crawl)
        };
        tracing::info!("Fetched {} posts for {} ({})", crawl.posts.len(), site, crawl.stop);

        let articles = parse_posts(&crawl.posts, &categories);
        let articles_parsed = articles.len();
        let new_articles = filter_new(articles, &existing_ids);

        let appended = if new_articles.is_empty() {
            tracing::info!("No new articles for {}", site);
            0
        } else {
            self.store
                .append(&key, new_articles)
                .map_err(|e| HarvestError::at(SiteStage::MergeAndPersist, e))?
        };

        let dataset_size = self
            .store
            .load(&key)
            .map_err(|e| HarvestError::at(SiteStage::Report, e))?
            .len();
        tracing::info!("Total articles for {}: {}", site, dataset_size);

        Ok(SiteReport {
            site: site.to_string(),
            mode,
            total_pages,
            pages_requested: crawl.pages_requested,
            pages_failed: crawl.pages_failed,
            stop: crawl.stop,
            posts_fetched: crawl.posts.len(),
            articles_parsed,
            new_articles: appended,
            dataset_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HarvesterConfig, HttpConfig, OutputConfig, SiteEntry};
    use tempfile::TempDir;

    fn create_test_config(dir: &TempDir, sites: &[&str]) -> Config {
        Config {
            harvester: HarvesterConfig::default(),
            http: HttpConfig::default(),
            output: OutputConfig {
                data_dir: dir.path().to_path_buf(),
            },
            sites: sites.iter().map(|s| SiteEntry::new(*s)).collect(),
        }
    }

    #[test]
    fn test_json_store_uses_data_dir() {
        let dir = TempDir::new().unwrap();
        let coordinator = Coordinator::with_json_store(create_test_config(&dir, &["kurir.mk"]));
        assert_eq!(coordinator.store().data_dir(), dir.path());
        assert_eq!(coordinator.config().sites.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_site_fails_while_resolving_metadata() {
        let dir = TempDir::new().unwrap();
        let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[]));

        let err = coordinator.harvest_site("ftp://kurir.mk").await.unwrap_err();
        assert_eq!(err.stage(), Some(SiteStage::ResolveMetadata));
    }

    #[tokio::test]
    async fn test_ready_shutdown_interrupts_first_site() {
        let dir = TempDir::new().unwrap();
        let coordinator =
            Coordinator::with_json_store(create_test_config(&dir, &["kurir.mk", "sdk.mk"]));

        let result = coordinator.run_with_shutdown(std::future::ready(())).await;
        match result {
            Err(HarvestError::Interrupted { site }) => assert_eq!(site, "kurir.mk"),
            other => panic!("expected interruption, got {:?}", other.map(|s| s.successful())),
        }
        assert!(!coordinator.store().dataset_path("kurir_mk").exists());
    }

    #[tokio::test]
    async fn test_empty_site_list_is_an_empty_summary() {
        let dir = TempDir::new().unwrap();
        let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[]));

        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.total_sites, 0);
        assert_eq!(summary.successful(), 0);
        assert!(summary.failures.is_empty());
    }
}
