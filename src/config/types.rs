use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for wp-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

/// Pagination, concurrency and retry tuning
#[derive(Debug, Clone, Deserialize)]
pub struct HarvesterConfig {
    /// Number of posts requested per page (WordPress caps this at 100)
    #[serde(rename = "posts-per-page", default = "default_posts_per_page")]
    pub posts_per_page: u32,

    /// Maximum number of page fetches in flight during a first run
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Attempts made by the fetch primitive before giving up on a request
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit (milliseconds); attempt `a` waits `unit * 2^a`
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// `per_page` used for the single categories request
    #[serde(rename = "category-page-size", default = "default_category_page_size")]
    pub category_page_size: u32,
}

impl HarvesterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            posts_per_page: default_posts_per_page(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            category_page_size: default_category_page_size(),
        }
    }
}

/// Fixed header set sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding one `<site>_articles_dataset.json` per site
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// A site to harvest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteEntry {
    /// Bare domain (`kurir.mk`) or explicit base URL (`http://127.0.0.1:8080`)
    pub domain: String,
}

impl SiteEntry {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

fn default_posts_per_page() -> u32 {
    100
}

fn default_max_concurrent_requests() -> u32 {
    5
}

fn default_request_timeout() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_category_page_size() -> u32 {
    100
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_accept() -> String {
    "application/json, text/plain, */*".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
