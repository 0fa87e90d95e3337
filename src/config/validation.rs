use crate::config::types::{Config, HarvesterConfig, HttpConfig, OutputConfig, SiteEntry};
use crate::url::{site_base_url, site_key};
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates pagination, concurrency and retry settings
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.posts_per_page < 1 || config.posts_per_page > 100 {
        return Err(ConfigError::Validation(format!(
            "posts_per_page must be between 1 and 100, got {}",
            config.posts_per_page
        )));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.backoff_base_ms < 1 {
        return Err(ConfigError::Validation(
            "backoff_base_ms must be >= 1".to_string(),
        ));
    }

    if config.category_page_size < 1 || config.category_page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "category_page_size must be between 1 and 100, got {}",
            config.category_page_size
        )));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.accept.trim().is_empty() {
        return Err(ConfigError::Validation("accept cannot be empty".to_string()));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site list
///
/// Every entry must be a plausible domain or an http(s) base URL, and no two
/// entries may map to the same dataset file.
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in sites {
        validate_site(&entry.domain)?;

        if !seen.insert(site_key(&entry.domain)) {
            return Err(ConfigError::InvalidSite(format!(
                "Site '{}' is listed more than once",
                entry.domain
            )));
        }
    }

    Ok(())
}

fn validate_site(site: &str) -> Result<(), ConfigError> {
    if site.contains("://") {
        site_base_url(site)
            .map(|_| ())
            .map_err(|e| ConfigError::InvalidSite(format!("'{}': {}", site, e)))
    } else {
        validate_domain_string(site)
    }
}

/// Validates a bare domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidSite(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidSite(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidSite(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidSite(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidSite(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
