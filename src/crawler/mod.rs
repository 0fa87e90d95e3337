//! Crawler module for harvesting the posts of WordPress sites
//!
//! This module contains the core harvesting logic, including:
//! - JSON fetching with retry, backoff and rate-limit handling
//! - Category and page-count resolution
//! - Post parsing into articles
//! - First-run and incremental pagination
//! - Per-site coordination

mod coordinator;
mod fetcher;
mod metadata;
mod parser;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, parse_retry_after, FetchError, Fetcher, RetryPolicy};
pub use metadata::{
    build_category_map, fetch_category_map, fetch_total_pages, CategoryMap, TOTAL_PAGES_HEADER,
};
pub use parser::{parse_post, parse_posts, strip_html, ParseError, RawPost};
pub use scheduler::{CrawlOutput, PageSource, PostsEndpoint, Scheduler};

use crate::config::Config;
use crate::output::RunSummary;
use crate::HarvestError;

/// Harvests every site of `config` into JSON datasets under its data directory
///
/// # Example
///
/// ```no_run
/// use wp_harvest::config::load_config;
/// use wp_harvest::crawler::harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let summary = harvest(config).await?;
/// println!("{} sites harvested", summary.successful());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: Config) -> Result<RunSummary, HarvestError> {
    Coordinator::with_json_store(config).run().await
}
