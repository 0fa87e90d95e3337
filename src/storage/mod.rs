//! Storage module for persisting per-site article datasets
//!
//! This module handles:
//! - The `Article` record written to disk
//! - Loading and saving one JSON dataset file per site
//! - Deriving the set of already stored article ids
//! - Filtering fetched articles against that set
//! - Best-effort date ordering of a dataset before it is written

mod json;
mod traits;

pub use json::{dataset_file_name, JsonFileStore};
pub use traits::{DatasetStore, StorageError, StorageResult};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One harvested article as stored in a site dataset
///
/// Identity is `id` alone. Records produced by the parser always carry an
/// id; a record loaded from a hand-edited file may not, in which case it is
/// kept as-is but never counts as a stored id. Unknown fields survive a
/// load/save cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default)]
    pub link: Option<String>,

    /// ISO-8601 publication date as reported by the site (may be missing or malformed)
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub title: String,

    /// Plain-text body
    #[serde(default)]
    pub content: String,

    /// Category names in the order the post lists them
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keeps only the articles whose id is not already stored
///
/// Articles without an id are kept. Duplicates within `articles` itself are
/// not removed here; the store rejects them on append.
pub fn filter_new(articles: Vec<Article>, existing_ids: &HashSet<i64>) -> Vec<Article> {
    let total = articles.len();
    let new_articles: Vec<Article> = articles
        .into_iter()
        .filter(|article| article.id.map_or(true, |id| !existing_ids.contains(&id)))
        .collect();

    tracing::info!(
        "Found {} new articles out of {} total",
        new_articles.len(),
        total
    );
    new_articles
}

/// Collects the ids of a dataset, skipping records without one
pub fn collect_ids(articles: &[Article]) -> HashSet<i64> {
    articles.iter().filter_map(|article| article.id).collect()
}

/// Parses an article date
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.f]]` (also with a space
/// separator) and RFC 3339 with an offset, which is compared in UTC.
pub fn parse_article_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Orders articles ascending by date, all or nothing
///
/// A missing date sorts first. If any present date fails to parse, the input
/// order is returned unchanged together with `false`.
pub fn sort_by_date(articles: Vec<Article>) -> (Vec<Article>, bool) {
    let keys: Option<Vec<NaiveDateTime>> = articles
        .iter()
        .map(|article| match article.date.as_deref() {
            None => Some(NaiveDateTime::MIN),
            Some(raw) => {
                let parsed = parse_article_date(raw);
                if parsed.is_none() {
                    tracing::warn!(
                        "Date parsing failed for article {:?} ({:?}). Saving without sorting.",
                        article.id,
                        raw
                    );
                }
                parsed
            }
        })
        .collect();

    let Some(keys) = keys else {
        return (articles, false);
    };

    let mut keyed: Vec<(NaiveDateTime, Article)> = keys.into_iter().zip(articles).collect();
    // Stable: equal dates keep their relative order
    keyed.sort_by_key(|(key, _)| *key);

    (keyed.into_iter().map(|(_, article)| article).collect(), true)
}

#[cfg(test)]
pub(crate) fn test_article(id: i64, date: Option<&str>) -> Article {
    Article {
        id: Some(id),
        link: Some(format!("https://example.com/?p={}", id)),
        date: date.map(str::to_string),
        title: format!("Article {}", id),
        content: String::new(),
        categories: Vec::new(),
        extra: Map::new(),
    }
}
