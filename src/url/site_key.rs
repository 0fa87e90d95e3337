/// Derives the dataset key for a site identifier
///
/// The scheme and any trailing slash are dropped, the rest is lowercased and
/// every character other than ASCII alphanumerics, `-` and `_` becomes `_`.
///
/// # Examples
///
/// ```
/// use wp_harvest::url::site_key;
///
/// assert_eq!(site_key("kurir.mk"), "kurir_mk");
/// assert_eq!(site_key("https://Kurir.mk/"), "kurir_mk");
/// assert_eq!(site_key("mkd-news.com"), "mkd-news_com");
/// ```
pub fn site_key(site: &str) -> String {
    let without_scheme = site
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(site)
        .trim_end_matches('/');

    without_scheme
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
