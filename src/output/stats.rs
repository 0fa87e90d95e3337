//! Statistics over stored datasets
//!
//! This module provides functionality for summarising a site's dataset
//! without touching the network.

use crate::storage::{parse_article_date, Article, DatasetStore, StorageResult};
use crate::url::site_key;
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Number of categories listed by [`print_statistics`]
pub const TOP_CATEGORIES: usize = 10;

/// Dataset statistics for one site
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStatistics {
    pub site: String,

    /// Total number of stored articles
    pub articles: usize,

    /// Articles stored without an id
    pub without_id: usize,

    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,

    /// Articles whose date is present but could not be parsed
    pub unparseable_dates: usize,

    /// Category names with their article counts, most frequent first
    pub top_categories: Vec<(String, usize)>,
}

/// Computes statistics over a loaded dataset
pub fn compute_statistics(site: &str, articles: &[Article]) -> DatasetStatistics {
    let mut earliest: Option<NaiveDateTime> = None;
    let mut latest: Option<NaiveDateTime> = None;
    let mut unparseable_dates = 0;
    let mut category_counts: HashMap<&str, usize> = HashMap::new();

    for article in articles {
        if let Some(raw) = article.date.as_deref() {
            match parse_article_date(raw) {
                Some(date) => {
                    earliest = Some(earliest.map_or(date, |e| e.min(date)));
                    latest = Some(latest.map_or(date, |l| l.max(date)));
                }
                None => unparseable_dates += 1,
            }
        }

        for category in &article.categories {
            *category_counts.entry(category.as_str()).or_insert(0) += 1;
        }
    }

    let mut top_categories: Vec<(String, usize)> = category_counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    // Most frequent first, ties by name
    top_categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    DatasetStatistics {
        site: site.to_string(),
        articles: articles.len(),
        without_id: articles.iter().filter(|a| a.id.is_none()).count(),
        earliest,
        latest,
        unparseable_dates,
        top_categories,
    }
}

/// Loads a site's dataset from the store and computes its statistics
///
/// # Arguments
///
/// * `store` - The dataset backend
/// * `site` - The site entry as configured
pub fn load_statistics(store: &dyn DatasetStore, site: &str) -> StorageResult<DatasetStatistics> {
    let articles = store.load(&site_key(site))?;
    Ok(compute_statistics(site, &articles))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== {} ===", stats.site);
    println!("  Articles: {}", stats.articles);
    if stats.without_id > 0 {
        println!("  Without id: {}", stats.without_id);
    }

    match (stats.earliest, stats.latest) {
        (Some(earliest), Some(latest)) => {
            println!("  Earliest: {}", earliest);
            println!("  Latest: {}", latest);
        }
        _ => println!("  No dated articles"),
    }
    if stats.unparseable_dates > 0 {
        println!("  Unparseable dates: {}", stats.unparseable_dates);
    }

    if !stats.top_categories.is_empty() {
        println!("  Top categories:");
        for (name, count) in stats.top_categories.iter().take(TOP_CATEGORIES) {
            let percentage = if stats.articles > 0 {
                (*count as f64 / stats.articles as f64) * 100.0
            } else {
                0.0
            };
            println!("    {}: {} ({:.1}%)", name, count, percentage);
        }
    }
    println!();
}
