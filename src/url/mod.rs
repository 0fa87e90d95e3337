//! Site addressing
//!
//! Turns a configured site identifier into the REST endpoints to query and the
//! key its dataset file is stored under.

mod site_key;

use crate::{UrlError, UrlResult};
use url::Url;

pub use site_key::site_key;

/// Path of the posts collection, relative to the site base
pub const POSTS_PATH: &str = "wp-json/wp/v2/posts";

/// Path of the categories collection, relative to the site base
pub const CATEGORIES_PATH: &str = "wp-json/wp/v2/categories";

/// The REST endpoints of one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEndpoints {
    /// Base URL the endpoints are resolved against (always ends in `/`)
    pub base: Url,

    /// `<base>/wp-json/wp/v2/posts`
    pub posts: Url,

    /// `<base>/wp-json/wp/v2/categories`
    pub categories: Url,
}

impl SiteEndpoints {
    /// Resolves the endpoints for a site entry
    ///
    /// # Examples
    ///
    /// ```
    /// use wp_harvest::url::SiteEndpoints;
    ///
    /// let endpoints = SiteEndpoints::for_site("kurir.mk").unwrap();
    /// assert_eq!(endpoints.posts.as_str(), "https://kurir.mk/wp-json/wp/v2/posts");
    /// ```
    pub fn for_site(site: &str) -> UrlResult<Self> {
        let base = site_base_url(site)?;
        let posts = base
            .join(POSTS_PATH)
            .map_err(|e| UrlError::Parse(e.to_string()))?;
        let categories = base
            .join(CATEGORIES_PATH)
            .map_err(|e| UrlError::Parse(e.to_string()))?;

        Ok(Self {
            base,
            posts,
            categories,
        })
    }
}

/// Parses a site entry into its base URL
///
/// A bare domain is served over HTTPS. An explicit `http://` or `https://`
/// base keeps its scheme, port and path; query and fragment are dropped and
/// the path always ends with `/` so that endpoint paths join beneath it.
pub fn site_base_url(site: &str) -> UrlResult<Url> {
    let raw = if site.contains("://") {
        site.to_string()
    } else {
        format!("https://{}", site)
    };

    let mut url = Url::parse(&raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS sites are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(site.to_string()));
    }

    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
