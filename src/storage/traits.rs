//! Storage traits and error types
//!
//! This module defines the trait interface for dataset backends and
//! associated error types.

use crate::storage::{collect_ids, sort_by_date, Article};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid dataset JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for per-site dataset backends
///
/// A dataset is the full ordered article collection of one site, addressed by
/// its site key. Datasets are append-only: stored articles are never patched.
/// Implementations only need `load` and `write`; ordering, id tracking and
/// duplicate rejection are shared.
pub trait DatasetStore {
    /// Loads the dataset of a site, or an empty one if nothing is stored
    fn load(&self, site_key: &str) -> StorageResult<Vec<Article>>;

    /// Replaces the stored dataset with `articles`, exactly in the given order
    fn write(&self, site_key: &str, articles: &[Article]) -> StorageResult<()>;

    /// Ids of every stored article that has one
    fn existing_ids(&self, site_key: &str) -> StorageResult<HashSet<i64>> {
        let ids = collect_ids(&self.load(site_key)?);
        tracing::info!("Loaded {} previously scraped article IDs", ids.len());
        Ok(ids)
    }

    /// Saves a full dataset, sorted ascending by date when every date parses
    fn save(&self, site_key: &str, articles: Vec<Article>) -> StorageResult<()> {
        let (articles, _sorted) = sort_by_date(articles);
        self.write(site_key, &articles)?;
        tracing::info!("Saved {} articles for {}", articles.len(), site_key);
        Ok(())
    }

    /// Appends articles after the stored ones and saves the result
    ///
    /// An incoming article whose id is already stored, or already appeared
    /// earlier in `new_articles`, is dropped so that ids stay unique.
    ///
    /// # Returns
    ///
    /// The number of articles actually appended
    fn append(&self, site_key: &str, new_articles: Vec<Article>) -> StorageResult<usize> {
        let mut articles = self.load(site_key)?;
        let mut seen = collect_ids(&articles);
        let offered = new_articles.len();

        let before = articles.len();
        articles.extend(
            new_articles
                .into_iter()
                .filter(|article| article.id.map_or(true, |id| seen.insert(id))),
        );
        let appended = articles.len() - before;

        if appended < offered {
            tracing::warn!(
                "Dropped {} articles for {} whose ids were already present",
                offered - appended,
                site_key
            );
        }

        self.save(site_key, articles)?;
        tracing::info!("Appended {} new articles", appended);
        Ok(appended)
    }
}
