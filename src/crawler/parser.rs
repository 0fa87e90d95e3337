//! Post parser
//!
//! Turns raw post objects from the posts endpoint into [`Article`] records:
//! - `title` is taken from `title.rendered` as delivered
//! - `content` is `content.rendered` reduced to plain text
//! - category ids are resolved through the site's [`CategoryMap`]

use crate::crawler::metadata::CategoryMap;
use crate::storage::Article;
use scraper::Html;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while parsing a single post
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("post is not a JSON object")]
    NotAnObject,

    #[error("post has no integer id")]
    MissingId,

    #[error("post {post_id} has a non-integer category id: {value}")]
    InvalidCategory { post_id: i64, value: String },
}

/// One post object exactly as the posts endpoint returned it
#[derive(Debug, Clone, PartialEq)]
pub struct RawPost(pub Value);

impl RawPost {
    /// The integer `id` field, if present
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for RawPost {
    fn from(value: Value) -> Self {
        RawPost(value)
    }
}

/// Parses one raw post into an article
///
/// # Arguments
///
/// * `raw` - The post object from the API
/// * `categories` - Category id to name map for the post's site
///
/// # Returns
///
/// * `Ok(Article)` - The parsed article
/// * `Err(ParseError)` - The post is not an object, lacks an integer id, or
///   lists a category id that is not an integer
pub fn parse_post(raw: &RawPost, categories: &CategoryMap) -> Result<Article, ParseError> {
    let post = raw.0.as_object().ok_or(ParseError::NotAnObject)?;
    let id = post
        .get("id")
        .and_then(Value::as_i64)
        .ok_or(ParseError::MissingId)?;

    let title = rendered(post.get("title")).to_string();
    let content = strip_html(rendered(post.get("content")));

    let category_ids = post
        .get("categories")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let categories = category_ids
        .iter()
        .map(|value| {
            let category_id = value.as_i64().ok_or_else(|| ParseError::InvalidCategory {
                post_id: id,
                value: value.to_string(),
            })?;
            Ok(categories
                .get(&category_id)
                .cloned()
                .unwrap_or_else(|| format!("category_{}", category_id)))
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(Article {
        id: Some(id),
        link: string_field(post, "link"),
        date: string_field(post, "date"),
        title,
        content,
        categories,
        extra: Map::new(),
    })
}

/// Parses a batch of raw posts, skipping the ones that fail
pub fn parse_posts(raws: &[RawPost], categories: &CategoryMap) -> Vec<Article> {
    let articles: Vec<Article> = raws
        .iter()
        .filter_map(|raw| match parse_post(raw, categories) {
            Ok(article) => Some(article),
            Err(e) => {
                tracing::error!("Error parsing post {:?}: {}", raw.id(), e);
                None
            }
        })
        .collect();

    tracing::info!("Parsed {} of {} posts", articles.len(), raws.len());
    articles
}

/// Reduces an HTML fragment to plain text
///
/// Text nodes are joined with single spaces and runs of whitespace collapse.
/// Script and style contents are dropped.
pub fn strip_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut words: Vec<&str> = Vec::new();

    for node in fragment.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| matches!(el.name(), "script" | "style"))
        });
        if hidden {
            continue;
        }

        words.extend(text.split_whitespace());
    }

    words.join(" ")
}

/// `field.rendered` as a string, or empty
fn rendered(field: Option<&Value>) -> &str {
    field
        .and_then(|f| f.get("rendered"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn string_field(post: &Map<String, Value>, key: &str) -> Option<String> {
    post.get(key).and_then(Value::as_str).map(str::to_string)
}
