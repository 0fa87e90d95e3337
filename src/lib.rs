//! wp-harvest: an incremental WordPress article harvester
//!
//! This crate pages through the `wp-json/wp/v2/posts` endpoint of many sites,
//! keeping one deduplicated, append-only JSON dataset per site. The first run
//! of a site fans out over every page; later runs walk pages in order and stop
//! as soon as they reach content that is already stored.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for wp-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Harvest interrupted while processing {site}")]
    Interrupted { site: String },

    #[error("{stage} failed: {source}")]
    Stage {
        stage: state::SiteStage,
        source: Box<HarvestError>,
    },
}

impl HarvestError {
    /// Attributes an error to the site pipeline stage it came from
    pub fn at(stage: state::SiteStage, error: impl Into<HarvestError>) -> Self {
        HarvestError::Stage {
            stage,
            source: Box::new(error.into()),
        }
    }

    /// The pipeline stage an error was attributed to, if any
    pub fn stage(&self) -> Option<state::SiteStage> {
        match self {
            HarvestError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid site entry: {0}")]
    InvalidSite(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in site entry: {0}")]
    MissingHost(String),
}

/// Result type alias for wp-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use state::{CrawlMode, PageOutcome, SiteStage};
pub use storage::{Article, DatasetStore, JsonFileStore};
pub use crate::url::{site_key, SiteEndpoints};
