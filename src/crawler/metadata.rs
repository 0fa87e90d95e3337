//! Per-site metadata: category names and total page count
//!
//! Both resolvers degrade instead of failing: a site without reachable
//! categories gets an empty map, and a site whose page count cannot be read
//! is crawled as a single page.

use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::HarvestError;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Category id to display name, built fresh for every site run
pub type CategoryMap = HashMap<i64, String>;

/// Response header carrying the number of pages at the requested page size
pub const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

/// Fetches the categories of a site and builds an id → name map
///
/// Issues a single request for `per_page` categories. Entries without an
/// integer `id` or a string `name` are skipped. Any failure yields an empty map.
pub async fn fetch_category_map(fetcher: &Fetcher, categories_url: &Url, per_page: u32) -> CategoryMap {
    let items = match fetcher
        .fetch_json_array(categories_url, &[("per_page", per_page)])
        .await
    {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("Failed to fetch categories: {}", e);
            return CategoryMap::new();
        }
    };

    let category_map = build_category_map(&items);
    if category_map.is_empty() {
        tracing::warn!("No categories found at {}", categories_url);
    } else {
        tracing::info!("Fetched {} categories", category_map.len());
    }
    category_map
}

/// Builds the id → name map from raw category objects
pub fn build_category_map(items: &[Value]) -> CategoryMap {
    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id")?.as_i64()?;
            let name = item.get("name")?.as_str()?;
            Some((id, name.to_string()))
        })
        .collect()
}

/// Determines how many pages of posts a site has
///
/// Sends one direct request (outside the retry loop) at the configured page
/// size and reads `X-WP-TotalPages`. A missing header, an error status, a
/// transport failure or an unreadable value all degrade to `1`. A reported
/// `0` is raised to `1`.
pub async fn fetch_total_pages(fetcher: &Fetcher, posts_url: &Url, per_page: u32) -> u32 {
    match request_total_pages(fetcher, posts_url, per_page).await {
        Ok(Some(total_pages)) => {
            let total_pages = total_pages.max(1);
            tracing::info!("Total pages available: {}", total_pages);
            total_pages
        }
        Ok(None) => {
            tracing::warn!(
                "No {} header from {}, assuming a single page",
                TOTAL_PAGES_HEADER,
                posts_url
            );
            1
        }
        Err(e) => {
            tracing::error!("Error fetching total pages: {}", e);
            1
        }
    }
}

async fn request_total_pages(
    fetcher: &Fetcher,
    posts_url: &Url,
    per_page: u32,
) -> Result<Option<u32>, HarvestError> {
    let http_error = |source| HarvestError::Http {
        url: posts_url.to_string(),
        source,
    };

    let response = fetcher
        .client()
        .get(posts_url.clone())
        .query(&[("per_page", per_page)])
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(http_error)?;

    let Some(value) = response.headers().get(TOTAL_PAGES_HEADER) else {
        return Ok(None);
    };

    let raw = value.to_str().unwrap_or_default().trim();
    let total_pages = raw.parse::<u32>().map_err(|_| FetchError::InvalidHeader {
        url: posts_url.to_string(),
        header: TOTAL_PAGES_HEADER,
        value: raw.to_string(),
    })?;

    Ok(Some(total_pages))
}
