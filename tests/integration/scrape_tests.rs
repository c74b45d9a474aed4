use job_sift::config::{parse_config, Config};
use job_sift::dedup::RecommendedAction;
use job_sift::pipeline::ingest;
use job_sift::scraper::{HttpFetcher, PageFetcher};
use job_sift::storage::{JobStore, SqliteJobStore};
use job_sift::{DeduplicationEngine, ScraperRegistry, ScrapingOptions};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a configuration with one board served by `server`
///
/// The board knows two layouts: `v2` (cards, active) and `v1` (list).
fn board_config(name: &str, server: &MockServer, db_path: &str) -> Config {
    let uri = server.uri();
    parse_config(&format!(
        r#"
[http]
user-agent = "JobSiftTest/1.0"
timeout-secs = 5

[storage]
database-path = "{db_path}"

[[source]]
name = "{name}"
base-url = "{uri}"
page-url = "{uri}/jobs?page={{page}}"
page-delay = {{ min-ms = 0, max-ms = 0 }}

[source.rate-limit]
requests-per-minute = 1000
delay-between-requests = {{ min-ms = 0, max-ms = 0 }}

[source.retry]
max-attempts = 2
base-delay-ms = 10

[[source.version]]
id = "v2"
item = "div.card"
title = "h2"
company = ".org"
location = ".where"
link = "a.apply"
next-page = "a.next"
fingerprints = ["div.cards"]

[[source.version]]
id = "v1"
item = "li.job"
title = ".title"
company = ".company"
location = ".location"
link = "a.link"
tags = ".tags span"
next-page = "li.next a"
fingerprints = ["ul.listings"]
"#
    ))
    .expect("test config should be valid")
}

fn card_page(jobs: &[(&str, &str, &str)], next: bool) -> String {
    let cards: String = jobs
        .iter()
        .map(|(slug, title, company)| {
            format!(
                r#"<div class="card"><h2>{title}</h2><span class="org">{company}</span><span class="where">Berlin, Germany</span><a class="apply" href="/apply/{slug}">Apply</a></div>"#
            )
        })
        .collect();
    let next = if next { r#"<a class="next" href="/jobs?page=2">Next</a>"# } else { "" };
    format!(r#"<html><body><div class="cards">{cards}</div>{next}</body></html>"#)
}

fn list_page(jobs: &[(&str, &str, &str)]) -> String {
    let items: String = jobs
        .iter()
        .map(|(slug, title, company)| {
            format!(
                r#"<li class="job"><a class="link" href="/apply/{slug}"><span class="title">{title}</span></a><span class="company">{company}</span><span class="location">Remote</span><div class="tags"><span>rust</span></div></li>"#
            )
        })
        .collect();
    format!(r#"<html><body><ul class="listings">{items}</ul></body></html>"#)
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn fetcher(config: &Config) -> Arc<dyn PageFetcher> {
    Arc::new(HttpFetcher::new(&config.http).expect("client should build"))
}

#[tokio::test]
async fn test_scrape_dedup_store_cycle() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config = board_config("board", &server, db_path.to_str().unwrap());

    mount_page(
        &server,
        "1",
        card_page(&[("1", "Rust Engineer", "Acme"), ("2", "Data Analyst", "Globex")], true),
    )
    .await;
    mount_page(
        &server,
        "2",
        card_page(&[("3", "Platform Engineer", "Initech")], false),
    )
    .await;

    let registry = ScraperRegistry::from_config(&config, fetcher(&config)).unwrap();
    let report = registry.scrape_all(&ScrapingOptions::default()).await;

    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes[0].is_success());
    assert_eq!(report.outcomes[0].version, "v2");
    assert_eq!(report.postings.len(), 3);

    let first = &report.postings[0];
    assert_eq!(first.title, "Rust Engineer");
    assert_eq!(first.location, "Berlin, Germany");
    assert_eq!(first.apply_link, format!("{}/apply/1", server.uri()));
    assert_eq!(first.source, "board");

    let store = Arc::new(SqliteJobStore::new(&db_path).unwrap());
    let engine = DeduplicationEngine::new(Arc::clone(&store));

    let summary = ingest(&report.postings, &engine, &config.dedup);
    assert_eq!(summary.created, 3);
    assert_eq!(store.count().unwrap(), 3);

    // A second run sees the same links and stores nothing new
    let again = registry.scrape_all(&ScrapingOptions::default()).await;
    let summary = ingest(&again.postings, &engine, &config.dedup);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.created, 0);
    assert_eq!(store.count().unwrap(), 3);

    let decision = engine
        .check_for_duplicates(&again.postings[0], &config.dedup)
        .unwrap();
    assert_eq!(decision.recommended_action, RecommendedAction::Skip);
    assert_eq!(decision.confidence, 1.0);
}

#[tokio::test]
async fn test_layout_change_falls_back_to_detected_version() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = board_config("board", &server, dir.path().join("jobs.db").to_str().unwrap());

    let old_layout = list_page(&[("7", "Backend Developer", "Umbrella")]);
    mount_page(&server, "1", old_layout.clone()).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(old_layout))
        .mount(&server)
        .await;

    let registry = ScraperRegistry::from_config(&config, fetcher(&config)).unwrap();
    let scraper = registry.get("board").unwrap();
    assert_eq!(scraper.current_version(), "v2");

    let report = registry.scrape_all(&ScrapingOptions::default()).await;
    assert!(report.outcomes[0].is_success());
    assert_eq!(report.outcomes[0].version, "v1");
    assert_eq!(report.postings.len(), 1);
    assert_eq!(report.postings[0].tags, vec!["rust".to_string()]);
    assert!(report.postings[0].is_remote());

    assert_eq!(scraper.current_version(), "v1");
    let metrics = scraper.metrics();
    assert_eq!(metrics.active_protocol_version, "v1");
    assert!(metrics.last_scraped_at.is_some());
    assert_eq!(metrics.failed_requests, 0);
    assert_eq!(metrics.total_requests, 3);
}

#[tokio::test]
async fn test_failing_source_is_isolated() {
    let healthy = MockServer::start().await;
    let broken = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");

    mount_page(&healthy, "1", card_page(&[("1", "Rust Engineer", "Acme")], false)).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&healthy)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let mut config = board_config("healthy", &healthy, db_path.to_str().unwrap());
    let other = board_config("broken", &broken, db_path.to_str().unwrap());
    config.sources.extend(other.sources);

    let registry = ScraperRegistry::from_config(&config, fetcher(&config)).unwrap();
    let report = registry
        .scrape_all_concurrent(&ScrapingOptions::default())
        .await;

    assert_eq!(report.postings.len(), 1);
    let failed: Vec<_> = report.failed_sources().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source, "broken");
    assert_eq!(
        failed[0].error.as_deref(),
        Some("All scraper versions failed for broken")
    );

    let health = registry.check_all_scrapers_health().await;
    assert_eq!(health["healthy"], true);
    assert_eq!(health["broken"], false);

    // The failed fallback run leaves the original version active
    let broken = registry.get("broken").unwrap();
    assert_eq!(broken.current_version(), "v2");
}
