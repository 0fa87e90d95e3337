//! Pagination scheduler for the posts endpoint
//!
//! This module handles:
//! - First-run fan-out over every page, bounded by a concurrency limit
//! - Incremental sequential paging that stops at already stored content
//! - Per-page failure handling for both modes

use crate::config::HarvesterConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::RawPost;
use crate::state::{CrawlMode, PageOutcome, StopReason};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use url::Url;

/// A source of numbered post pages
///
/// `None` means the page could not be fetched; an empty `Vec` is a page
/// that exists but has no posts.
pub trait PageSource {
    fn fetch_page(&self, page: u32) -> impl Future<Output = Option<Vec<RawPost>>> + Send;
}

/// The live posts endpoint of one site
pub struct PostsEndpoint<'a> {
    fetcher: &'a Fetcher,
    posts_url: &'a Url,
    per_page: u32,
}

impl<'a> PostsEndpoint<'a> {
    pub fn new(fetcher: &'a Fetcher, posts_url: &'a Url, per_page: u32) -> Self {
        Self {
            fetcher,
            posts_url,
            per_page,
        }
    }
}

impl PageSource for PostsEndpoint<'_> {
    fn fetch_page(&self, page: u32) -> impl Future<Output = Option<Vec<RawPost>>> + Send {
        async move {
            let query = [("per_page", self.per_page), ("page", page)];
            match self.fetcher.fetch_json_array(self.posts_url, &query).await {
                Ok(items) => Some(items.into_iter().map(RawPost).collect()),
                Err(e) => {
                    tracing::error!("Failed to fetch page {}: {}", page, e);
                    None
                }
            }
        }
    }
}

/// Everything pagination produced for one site
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    /// Raw posts not previously stored, in arrival order
    pub posts: Vec<RawPost>,

    pub pages_requested: u32,

    pub pages_failed: u32,

    pub stop: StopReason,
}

impl CrawlOutput {
    fn new() -> Self {
        Self {
            posts: Vec::new(),
            pages_requested: 0,
            pages_failed: 0,
            stop: StopReason::Exhausted,
        }
    }
}

/// Drives pagination of a site in the mode chosen for it
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    max_concurrent: usize,
}

impl Scheduler {
    /// Creates a scheduler allowing `max_concurrent` in-flight page fetches
    /// during a first run (at least one)
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn from_config(config: &HarvesterConfig) -> Self {
        Self::new(config.max_concurrent_requests as usize)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Fetches pages `1..=total_pages` and returns the posts not yet stored
    ///
    /// # Arguments
    ///
    /// * `source` - Where pages come from
    /// * `total_pages` - Number of pages the site reports
    /// * `mode` - First run fans out; incremental walks in order and stops early
    /// * `existing_ids` - Ids already in the site's dataset
    pub async fn run<S: PageSource>(
        &self,
        source: &S,
        total_pages: u32,
        mode: CrawlMode,
        existing_ids: &HashSet<i64>,
    ) -> CrawlOutput {
        tracing::info!("Fetching posts ({} mode)", mode);
        if mode.is_concurrent() {
            self.crawl_all_pages(source, total_pages).await
        } else {
            Self::crawl_until_seen(source, total_pages, existing_ids).await
        }
    }

    /// First run: every page, at most `max_concurrent` at a time
    ///
    /// Posts are accumulated in completion order. A failed page is counted
    /// and skipped; its siblings keep going.
    async fn crawl_all_pages<S: PageSource>(&self, source: &S, total_pages: u32) -> CrawlOutput {
        let mut output = CrawlOutput::new();

        let mut pages = stream::iter(1..=total_pages)
            .map(move |page| async move { (page, source.fetch_page(page).await) })
            .buffer_unordered(self.max_concurrent);

        while let Some((page, result)) = pages.next().await {
            output.pages_requested += 1;
            match result {
                Some(posts) => {
                    tracing::info!(
                        "Fetched page {} ({} posts), {}/{} pages done",
                        page,
                        posts.len(),
                        output.pages_requested,
                        total_pages
                    );
                    output.posts.extend(posts);
                }
                None => {
                    output.pages_failed += 1;
                    tracing::warn!("Page {} failed, continuing with remaining pages", page);
                }
            }
        }

        tracing::info!(
            "Fetched {} posts from {} pages ({} failed)",
            output.posts.len(),
            output.pages_requested,
            output.pages_failed
        );
        output
    }

    /// Incremental run: one page at a time, in order
    ///
    /// Stops at the first failed page, or at the first page that has stored
    /// posts and no new ones.
    async fn crawl_until_seen<S: PageSource>(
        source: &S,
        total_pages: u32,
        existing_ids: &HashSet<i64>,
    ) -> CrawlOutput {
        let mut output = CrawlOutput::new();

        for page in 1..=total_pages {
            output.pages_requested += 1;

            let Some(posts) = source.fetch_page(page).await else {
                output.pages_failed += 1;
                output.stop = StopReason::PageFailed { page };
                tracing::warn!("Stopping pagination at page {}: fetch failed", page);
                break;
            };

            match absorb_page(&mut output.posts, posts, existing_ids) {
                PageOutcome::Continue { new, duplicate } => {
                    tracing::info!(
                        "Page {}: {} new, {} already scraped",
                        page,
                        new,
                        duplicate
                    );
                }
                PageOutcome::ReachedSeenContent { duplicate } => {
                    tracing::info!(
                        "Reached already scraped content at page {} ({} known posts). Stopping.",
                        page,
                        duplicate
                    );
                    output.stop = StopReason::ReachedSeenContent { page };
                    break;
                }
            }
        }

        tracing::info!(
            "Fetched {} new posts from {} pages",
            output.posts.len(),
            output.pages_requested
        );
        output
    }
}

/// Splits a page into new and stored posts, keeps the new ones
///
/// A post without an id is never considered stored.
fn absorb_page(
    accumulated: &mut Vec<RawPost>,
    posts: Vec<RawPost>,
    existing_ids: &HashSet<i64>,
) -> PageOutcome {
    let (duplicate, new): (Vec<RawPost>, Vec<RawPost>) = posts
        .into_iter()
        .partition(|post| post.id().map_or(false, |id| existing_ids.contains(&id)));

    let outcome = PageOutcome::from_counts(new.len(), duplicate.len());
    accumulated.extend(new);
    outcome
}
