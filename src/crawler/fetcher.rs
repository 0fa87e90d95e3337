//! HTTP fetch primitive
//!
//! This module handles every JSON request the harvester makes, including:
//! - Building the per-site HTTP client with the fixed header set
//! - Retry with exponential backoff for transient failures
//! - Honoring `Retry-After` on HTTP 429
//! - Classifying each attempt into an explicit outcome

use crate::config::{Config, HttpConfig};
use crate::HarvestError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a request produced no usable JSON
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("malformed JSON from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("unexpected response body from {url}: {message}")]
    UnexpectedBody { url: String, message: String },

    #[error("invalid {header} header from {url}: {value:?}")]
    InvalidHeader {
        url: String,
        header: &'static str,
        value: String,
    },
}

/// Retry budget and backoff unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_retries: u32,

    /// Attempt `a` backs off for `backoff_base * 2^a`
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Exponential backoff after a failed attempt (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Wait after a 429: the server's `Retry-After` seconds, else the backoff
    pub fn rate_limit_delay(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        retry_after
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.backoff_delay(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

/// Outcome of a single request attempt
#[derive(Debug)]
enum Attempt {
    Success(Value),
    RateLimited { retry_after: Option<u64> },
    Transient(String),
    Fatal(FetchError),
}

/// Builds an HTTP client carrying the fixed header set and timeout
///
/// `Accept-Encoding` is negotiated by the client itself from its gzip,
/// brotli and deflate support so that bodies are decoded transparently.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wp_harvest::config::HttpConfig;
/// use wp_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default(), Duration::from_secs(20)).unwrap();
/// ```
pub fn build_http_client(http: &HttpConfig, timeout: Duration) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_str(&http.accept)?);
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&http.accept_language)?);

    let client = Client::builder()
        .user_agent(http.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()?;

    Ok(client)
}

/// Reads an integral `Retry-After` value in seconds
///
/// The HTTP-date form is not supported and yields `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// JSON fetcher with retry, backoff and rate-limit handling
///
/// One fetcher (and so one connection pool) is built per site and dropped
/// when the site is done.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds a fetcher from the harvester and HTTP sections of the config
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.http, config.harvester.request_timeout())?;
        let policy = RetryPolicy::new(
            config.harvester.max_retries,
            config.harvester.backoff_base(),
        );
        Ok(Self::new(client, policy))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches a URL and decodes its body as JSON
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx with JSON body | Return immediately |
    /// | HTTP 429 | Wait `Retry-After` seconds (else `2^a` units), retry |
    /// | Other non-2xx status | Wait `2^a` units, retry |
    /// | Connect error / timeout | Wait `2^a` units, retry |
    /// | Malformed JSON body | Fail immediately |
    ///
    /// Every attempt counts toward `max_retries`. No wait follows the final
    /// attempt.
    pub async fn fetch_json(&self, url: &Url, query: &[(&str, u32)]) -> Result<Value, FetchError> {
        let max_retries = self.policy.max_retries;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_retries {
            match self.attempt(url, query).await {
                Attempt::Success(value) => return Ok(value),

                Attempt::RateLimited { retry_after } => {
                    last_error = "HTTP 429 Too Many Requests".to_string();
                    if attempt >= max_retries {
                        break;
                    }

                    let wait = self.policy.rate_limit_delay(attempt, retry_after);
                    tracing::warn!(
                        "Rate limited on {}. Waiting {:?} (attempt {}/{})",
                        url,
                        wait,
                        attempt,
                        max_retries
                    );
                    tokio::time::sleep(wait).await;
                }

                Attempt::Transient(error) => {
                    if attempt >= max_retries {
                        last_error = error;
                        break;
                    }

                    let wait = self.policy.backoff_delay(attempt);
                    tracing::warn!(
                        "Request error on {}: {}, retrying in {:?} ({}/{})",
                        url,
                        error,
                        wait,
                        attempt,
                        max_retries
                    );
                    last_error = error;
                    tokio::time::sleep(wait).await;
                }

                Attempt::Fatal(error) => {
                    tracing::error!("Unexpected error fetching {}: {}", url, error);
                    return Err(error);
                }
            }
        }

        tracing::error!("Request failed after {} attempts: {}", max_retries, url);
        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: max_retries,
            last_error,
        })
    }

    /// Fetches a URL whose body must be a JSON array
    pub async fn fetch_json_array(
        &self,
        url: &Url,
        query: &[(&str, u32)],
    ) -> Result<Vec<Value>, FetchError> {
        match self.fetch_json(url, query).await? {
            Value::Array(items) => Ok(items),
            other => Err(FetchError::UnexpectedBody {
                url: url.to_string(),
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }

    /// Sends one request and classifies the result
    async fn attempt(&self, url: &Url, query: &[(&str, u32)]) -> Attempt {
        let response = match self.client.get(url.clone()).query(query).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Attempt::Transient("request timeout".to_string()),
            Err(e) => return Attempt::Transient(e.to_string()),
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            };
        }

        if !status.is_success() {
            return Attempt::Transient(format!("HTTP {}", status));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Attempt::Transient(e.to_string()),
        };

        match serde_json::from_slice(&body) {
            Ok(value) => Attempt::Success(value),
            Err(source) => Attempt::Fatal(FetchError::Decode {
                url: url.to_string(),
                source,
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher(max_retries: u32) -> Fetcher {
        let client = build_http_client(&HttpConfig::default(), Duration::from_secs(5)).unwrap();
        Fetcher::new(client, RetryPolicy::new(max_retries, Duration::from_millis(1)))
    }

    fn posts_url(server: &MockServer) -> Url {
        Url::parse(&format!("{}/wp-json/wp/v2/posts", server.uri())).unwrap()
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(32));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff_delay(64) >= Duration::from_secs(u32::MAX as u64));
    }

    #[test]
    fn test_rate_limit_delay_prefers_retry_after() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_delay(1, Some(3)), Duration::from_secs(3));
        assert_eq!(policy.rate_limit_delay(3, None), Duration::from_secs(8));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(parse_retry_after(&headers), Some(3));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_build_http_client_rejects_bad_header() {
        let http = HttpConfig {
            accept: "bad\nvalue".to_string(),
            ..HttpConfig::default()
        };
        assert!(build_http_client(&http, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_success_returns_payload_and_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("per_page", "100"))
            .and(header_exists("accept"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let value = test_fetcher(5)
            .fetch_json(&posts_url(&server), &[("per_page", 100)])
            .await
            .unwrap();
        assert_eq!(value, json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_four_failures_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(4)
            .expect(4)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 42}])))
            .expect(1)
            .mount(&server)
            .await;

        let value = test_fetcher(5)
            .fetch_json(&posts_url(&server), &[])
            .await
            .unwrap();
        assert_eq!(value, json!([{"id": 42}]));
    }

    #[tokio::test]
    async fn test_five_failures_exhaust_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let result = test_fetcher(5).fetch_json(&posts_url(&server), &[]).await;
        match result {
            Err(FetchError::RetriesExhausted {
                attempts,
                last_error,
                ..
            }) => {
                assert_eq!(attempts, 5);
                assert!(last_error.contains("500"));
            }
            other => panic!("expected exhausted retries, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried_then_absent() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/wp-json/wp/v2/posts", addr)).unwrap();
        let result = test_fetcher(3).fetch_json(&url, &[]).await;
        assert!(matches!(
            result,
            Err(FetchError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_json_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let result = test_fetcher(5).fetch_json(&posts_url(&server), &[]).await;
        assert!(matches!(result, Err(FetchError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_retry_after_is_honored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let started = Instant::now();
        let value = test_fetcher(5)
            .fetch_json(&posts_url(&server), &[])
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(value, json!([]));
        assert!(elapsed >= Duration::from_secs(3), "waited {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(5), "waited {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_rate_limits_consume_the_attempt_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let result = test_fetcher(3).fetch_json(&posts_url(&server), &[]).await;
        assert!(matches!(
            result,
            Err(FetchError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_json_array_rejects_objects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": "rest_post_invalid_page_number"})),
            )
            .mount(&server)
            .await;

        let result = test_fetcher(2)
            .fetch_json_array(&posts_url(&server), &[])
            .await;
        assert!(matches!(result, Err(FetchError::UnexpectedBody { .. })));
    }
}
