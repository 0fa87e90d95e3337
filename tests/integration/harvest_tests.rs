//! Integration tests for the harvester
//!
//! These tests use wiremock to serve WordPress-style `posts` and
//! `categories` endpoints and drive the coordinator end-to-end against a
//! JSON store in a temporary directory.

use serde_json::{json, Value};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wp_harvest::config::{Config, HarvesterConfig, HttpConfig, OutputConfig, SiteEntry};
use wp_harvest::state::{SiteStage, StopReason};
use wp_harvest::storage::DatasetStore;
use wp_harvest::{site_key, Coordinator, CrawlMode, HarvestError, JsonFileStore};

const POSTS: &str = "/wp-json/wp/v2/posts";
const CATEGORIES: &str = "/wp-json/wp/v2/categories";

/// Creates a test configuration with fast retries for the given sites
fn create_test_config(data_dir: &TempDir, sites: &[String]) -> Config {
    Config {
        harvester: HarvesterConfig {
            posts_per_page: 3,
            max_retries: 2,
            backoff_base_ms: 1,
            ..HarvesterConfig::default()
        },
        http: HttpConfig::default(),
        output: OutputConfig {
            data_dir: data_dir.path().to_path_buf(),
        },
        sites: sites.iter().map(|s| SiteEntry::new(s.as_str())).collect(),
    }
}

/// A post whose date grows with its id
fn post(id: i64) -> Value {
    json!({
        "id": id,
        "date": format!("2024-01-{:02}T10:00:00", id - 10),
        "link": format!("https://example.com/?p={}", id),
        "title": {"rendered": format!("Post {}", id)},
        "content": {"rendered": format!("<p>Body of <b>{}</b></p>", id)},
        "categories": [1]
    })
}

/// Mounts categories plus one mock per page, newest posts first
///
/// Page mocks are mounted before the page-count mock so that a request
/// carrying `page` never falls through to it.
async fn mount_site(server: &MockServer, pages: &[Vec<i64>], total_pages_header: Option<usize>) {
    Mock::given(method("GET"))
        .and(path(CATEGORIES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "News"}])))
        .mount(server)
        .await;

    for (index, ids) in pages.iter().enumerate() {
        let body: Vec<Value> = ids.iter().map(|id| post(*id)).collect();
        Mock::given(method("GET"))
            .and(path(POSTS))
            .and(query_param("page", (index + 1).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    let mut count = ResponseTemplate::new(200).set_body_json(json!([]));
    if let Some(total) = total_pages_header {
        count = count.insert_header("X-WP-TotalPages", total.to_string().as_str());
    }
    Mock::given(method("GET"))
        .and(path(POSTS))
        .respond_with(count)
        .mount(server)
        .await;
}

fn stored_ids(store: &JsonFileStore, site: &str) -> Vec<i64> {
    store
        .load(&site_key(site))
        .unwrap()
        .iter()
        .filter_map(|article| article.id)
        .collect()
}

/// Page numbers of the posts requests a server received
async fn requested_pages(server: &MockServer) -> Vec<u32> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == POSTS)
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "page")
                .and_then(|(_, value)| value.parse().ok())
        })
        .collect()
}

#[tokio::test]
async fn test_first_run_stores_every_page_sorted_by_date() {
    let server = MockServer::start().await;
    mount_site(&server, &[vec![19, 18, 17], vec![16, 15, 14], vec![13, 12, 11]], Some(3)).await;

    let dir = TempDir::new().unwrap();
    let site = server.uri();
    let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[site.clone()]));

    let summary = coordinator.run().await.unwrap();
    assert_eq!(summary.successful(), 1);

    let report = &summary.reports[0];
    assert_eq!(report.mode, CrawlMode::FirstRun);
    assert_eq!(report.total_pages, 3);
    assert_eq!(report.pages_requested, 3);
    assert_eq!(report.new_articles, 9);
    assert_eq!(report.dataset_size, 9);
    assert_eq!(report.stop, StopReason::Exhausted);

    assert_eq!(
        stored_ids(coordinator.store(), &site),
        (11..=19).collect::<Vec<i64>>()
    );

    let articles = coordinator.store().load(&site_key(&site)).unwrap();
    assert_eq!(articles[0].title, "Post 11");
    assert_eq!(articles[0].content, "Body of 11");
    assert_eq!(articles[0].categories, vec!["News"]);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_site(&server, &[vec![19, 18, 17], vec![16, 15, 14]], Some(2)).await;

    let dir = TempDir::new().unwrap();
    let site = server.uri();
    let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[site.clone()]));

    coordinator.run().await.unwrap();
    let path = coordinator.store().dataset_path(&site_key(&site));
    let before = fs::read(&path).unwrap();

    let summary = coordinator.run().await.unwrap();
    let report = &summary.reports[0];
    assert_eq!(report.mode, CrawlMode::Incremental);
    assert_eq!(report.new_articles, 0);
    assert_eq!(report.pages_requested, 1);
    assert_eq!(report.stop, StopReason::ReachedSeenContent { page: 1 });

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_incremental_run_appends_new_posts_and_stops_early() {
    let server = MockServer::start().await;
    mount_site(&server, &[vec![19, 18, 17], vec![16, 15, 14]], Some(2)).await;

    let dir = TempDir::new().unwrap();
    let site = server.uri();
    let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[site.clone()]));
    coordinator.run().await.unwrap();

    // Two new posts push everything down by two
    server.reset().await;
    mount_site(
        &server,
        &[vec![21, 20, 19], vec![18, 17, 16], vec![15, 14]],
        Some(3),
    )
    .await;

    let summary = coordinator.run().await.unwrap();
    let report = &summary.reports[0];
    assert_eq!(report.mode, CrawlMode::Incremental);
    assert_eq!(report.new_articles, 2);
    assert_eq!(report.dataset_size, 8);
    assert_eq!(report.stop, StopReason::ReachedSeenContent { page: 2 });
    assert_eq!(requested_pages(&server).await, vec![1, 2]);

    assert_eq!(
        stored_ids(coordinator.store(), &site),
        (14..=21).collect::<Vec<i64>>()
    );
}

#[tokio::test]
async fn test_failing_site_does_not_stop_the_run() {
    let broken = MockServer::start().await;
    let healthy = MockServer::start().await;
    mount_site(&healthy, &[vec![12, 11]], Some(1)).await;

    let dir = TempDir::new().unwrap();
    let sites = vec![broken.uri(), healthy.uri()];
    let coordinator = Coordinator::with_json_store(create_test_config(&dir, &sites));

    // An unreadable dataset fails the site before any request is made
    fs::write(
        coordinator.store().dataset_path(&site_key(&broken.uri())),
        "{not json",
    )
    .unwrap();

    let summary = coordinator.run().await.unwrap();
    assert_eq!(summary.total_sites, 2);
    assert_eq!(summary.successful(), 1);
    assert_eq!(summary.failed_sites(), vec![broken.uri().as_str()]);
    assert_eq!(summary.failures[0].stage, Some(SiteStage::ResolveMetadata));

    assert_eq!(stored_ids(coordinator.store(), &healthy.uri()), vec![11, 12]);
    assert!(broken.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_failed_page_on_first_run_keeps_the_rest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(POSTS))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_site(&server, &[vec![19, 18], vec![17, 16], vec![15, 14]], Some(3)).await;

    let dir = TempDir::new().unwrap();
    let site = server.uri();
    let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[site.clone()]));

    let summary = coordinator.run().await.unwrap();
    let report = &summary.reports[0];
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.new_articles, 4);
    assert_eq!(stored_ids(coordinator.store(), &site), vec![14, 15, 18, 19]);
}

#[tokio::test]
async fn test_category_failure_falls_back_to_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CATEGORIES))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_site(&server, &[vec![12, 11]], Some(1)).await;

    let dir = TempDir::new().unwrap();
    let site = server.uri();
    let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[site.clone()]));

    coordinator.run().await.unwrap();
    let articles = coordinator.store().load(&site_key(&site)).unwrap();
    assert_eq!(articles.len(), 2);
    assert!(articles.iter().all(|a| a.categories == vec!["category_1"]));
}

#[tokio::test]
async fn test_missing_page_count_header_fetches_one_page() {
    let server = MockServer::start().await;
    mount_site(&server, &[vec![19, 18, 17], vec![16, 15, 14]], None).await;

    let dir = TempDir::new().unwrap();
    let site = server.uri();
    let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[site.clone()]));

    let summary = coordinator.run().await.unwrap();
    let report = &summary.reports[0];
    assert_eq!(report.total_pages, 1);
    assert_eq!(report.new_articles, 3);
    assert_eq!(requested_pages(&server).await, vec![1]);
}

#[tokio::test]
async fn test_shutdown_interrupts_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(POSTS))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([post(11)]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    mount_site(&server, &[], Some(1)).await;

    let dir = TempDir::new().unwrap();
    let site = server.uri();
    let coordinator = Coordinator::with_json_store(create_test_config(&dir, &[site.clone()]));

    let shutdown = tokio::time::sleep(Duration::from_millis(200));
    let result = coordinator.run_with_shutdown(shutdown).await;

    assert!(matches!(result, Err(HarvestError::Interrupted { site: s }) if s == site));
    assert!(!coordinator.store().dataset_path(&site_key(&site)).exists());
}
