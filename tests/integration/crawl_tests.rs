//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! harvest cycle end-to-end against a temporary store root.

use pdf_harvester::config::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, ThrottleConfig, UserAgentConfig,
};
use pdf_harvester::crawler::Coordinator;
use pdf_harvester::HarvestError;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_BODY: &[u8] = b"%PDF-1.4\n%test\n";

/// Creates a test configuration rooted at the mock server
fn create_test_config(base_url: &str, store_root: &Path) -> Config {
    Config {
        site: SiteConfig {
            seed: format!("{}/", base_url),
            allowed_domains: vec!["127.0.0.1".to_string()],
            document_dirs: vec!["/assets/media/".to_string()],
        },
        crawler: CrawlerConfig {
            concurrency: 4,
            depth_limit: 0,
            retry_budget: 2,
            redirect_limit: 5,
            request_timeout: 5,
            obey_robots: true,
            skip_existing: true,
        },
        throttle: ThrottleConfig {
            base_delay: 0,
            min_delay: 0,
            max_delay: 50,
            target_concurrency: 4.0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            store_root: store_root.to_path_buf(),
            cache_dir: None,
            cache_expiration: 0,
            summary_path: None,
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

fn pdf() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(PDF_BODY.to_vec(), "application/pdf")
}

async fn mount(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Number of requests the server received for `at`
async fn hits(server: &MockServer, at: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == at)
        .count()
}

#[tokio::test]
async fn test_full_harvest() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_raw("User-agent: *\nAllow: /", "text/plain"),
    )
    .await;
    mount(
        &server,
        "/",
        html(
            r#"<html><body>
            <a href="/a.pdf">A</a>
            <a href="/page2">Next</a>
            <a href="https://external.example.com/c.pdf">External</a>
            </body></html>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/page2",
        html(r#"<a href="/assets/media/2024/b.pdf">B</a><a href="/">Home</a>"#),
    )
    .await;
    mount(&server, "/a.pdf", pdf()).await;
    mount(&server, "/assets/media/2024/b.pdf", pdf()).await;

    let config = create_test_config(&server.uri(), store.path());
    let summary = Coordinator::from_config(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.documents_fetched, 2);
    assert_eq!(summary.pdfs_written, 2);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cancelled);

    assert_eq!(std::fs::read(store.path().join("a.pdf")).unwrap(), PDF_BODY);
    assert_eq!(
        std::fs::read(store.path().join("assets/media/2024/b.pdf")).unwrap(),
        PDF_BODY
    );
    assert!(!store.path().join("c.pdf").exists());

    assert_eq!(hits(&server, "/").await, 1);
    assert_eq!(hits(&server, "/a.pdf").await, 1);
    assert_eq!(hits(&server, "/robots.txt").await, 1);
}

#[tokio::test]
async fn test_robots_disallow_respected() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200)
            .set_body_raw("User-agent: *\nDisallow: /private/", "text/plain"),
    )
    .await;
    mount(
        &server,
        "/",
        html(r#"<a href="/private/secret.pdf">S</a><a href="/public.pdf">P</a>"#),
    )
    .await;
    mount(&server, "/private/secret.pdf", pdf()).await;
    mount(&server, "/public.pdf", pdf()).await;

    let config = create_test_config(&server.uri(), store.path());
    let summary = Coordinator::from_config(config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.robots_denied, 1);
    assert_eq!(hits(&server, "/private/secret.pdf").await, 0);
    assert!(store.path().join("public.pdf").exists());
    assert!(!store.path().join("private/secret.pdf").exists());
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(&server, "/", html(r#"<a href="/a.pdf">A</a>"#)).await;
    mount(&server, "/a.pdf", pdf()).await;

    let config = create_test_config(&server.uri(), store.path());
    let summary = Coordinator::from_config(config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pdfs_written, 1);
    assert_eq!(summary.robots_denied, 0);
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(&server, "/", html(r#"<a href="/level1">1</a>"#)).await;
    mount(
        &server,
        "/level1",
        html(r#"<a href="/level2">2</a><a href="/shallow.pdf">pdf</a>"#),
    )
    .await;
    mount(&server, "/level2", html(r#"<a href="/deep.pdf">pdf</a>"#)).await;
    mount(&server, "/shallow.pdf", pdf()).await;
    mount(&server, "/deep.pdf", pdf()).await;

    let mut config = create_test_config(&server.uri(), store.path());
    config.crawler.obey_robots = false;
    config.crawler.depth_limit = 2;

    let summary = Coordinator::from_config(config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pdfs_written, 1);
    assert!(store.path().join("shallow.pdf").exists());
    assert_eq!(hits(&server, "/level2").await, 1);
    assert_eq!(hits(&server, "/deep.pdf").await, 0);
}

#[tokio::test]
async fn test_pdf_detected_by_content_type() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(&server, "/", html(r#"<a href="/files/report">Report</a>"#)).await;
    mount(&server, "/files/report", pdf()).await;

    let mut config = create_test_config(&server.uri(), store.path());
    config.crawler.obey_robots = false;

    let summary = Coordinator::from_config(config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pdfs_written, 1);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(
        std::fs::read(store.path().join("files/report")).unwrap(),
        PDF_BODY
    );
}

#[tokio::test]
async fn test_server_errors_retried() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(&server, "/", html(r#"<a href="/flaky.pdf">F</a>"#)).await;
    Mock::given(method("GET"))
        .and(path("/flaky.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount(&server, "/flaky.pdf", pdf()).await;

    let mut config = create_test_config(&server.uri(), store.path());
    config.crawler.obey_robots = false;

    let summary = Coordinator::from_config(config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed, 0);
    assert_eq!(summary.pdfs_written, 1);
    assert_eq!(hits(&server, "/flaky.pdf").await, 3);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(&server, "/", html(r#"<a href="/missing.pdf">M</a>"#)).await;

    let mut config = create_test_config(&server.uri(), store.path());
    config.crawler.obey_robots = false;

    let summary = Coordinator::from_config(config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(hits(&server, "/missing.pdf").await, 1);
}

#[tokio::test]
async fn test_unreachable_seed_is_fatal() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(&server, "/", ResponseTemplate::new(500)).await;

    let mut config = create_test_config(&server.uri(), store.path());
    config.crawler.obey_robots = false;
    config.crawler.retry_budget = 1;

    let result = Coordinator::from_config(config).unwrap().run().await;

    assert!(matches!(result, Err(HarvestError::SeedUnreachable { .. })));
    assert_eq!(hits(&server, "/").await, 2);
}

#[tokio::test]
async fn test_redirect_followed_within_site() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();

    mount(&server, "/", html(r#"<a href="/old">Old</a>"#)).await;
    mount(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/new"),
    )
    .await;
    mount(&server, "/new", html(r#"<a href="/moved.pdf">M</a>"#)).await;
    mount(&server, "/moved.pdf", pdf()).await;

    let mut config = create_test_config(&server.uri(), store.path());
    config.crawler.obey_robots = false;

    let summary = Coordinator::from_config(config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pdfs_written, 1);
    assert!(store.path().join("moved.pdf").exists());
}

#[tokio::test]
async fn test_relaunch_served_from_cache() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    mount(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_raw("User-agent: *\nAllow: /", "text/plain"),
    )
    .await;
    mount(
        &server,
        "/",
        html(r#"<a href="/page">P</a><a href="/a.pdf">A</a>"#),
    )
    .await;
    mount(&server, "/page", html(r#"<a href="/b.pdf">B</a>"#)).await;
    mount(&server, "/a.pdf", pdf()).await;
    mount(&server, "/b.pdf", pdf()).await;

    let mut config = create_test_config(&server.uri(), store.path());
    config.output.cache_dir = Some(cache.path().to_path_buf());

    let first = Coordinator::from_config(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.pdfs_written, 2);
    let requests_after_first = server.received_requests().await.unwrap_or_default().len();

    let second = Coordinator::from_config(config)
        .unwrap()
        .run()
        .await
        .unwrap();

    let requests_after_second = server.received_requests().await.unwrap_or_default().len();
    assert_eq!(requests_after_first, requests_after_second);
    assert_eq!(second.cache_hits, 3);
    assert_eq!(second.pdfs_written, 0);
    assert_eq!(second.skipped, 2);
}

#[tokio::test]
async fn test_fresh_clears_cache() {
    let server = MockServer::start().await;
    let store = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    mount(&server, "/", html("<p>nothing here</p>")).await;

    let mut config = create_test_config(&server.uri(), store.path());
    config.crawler.obey_robots = false;
    config.output.cache_dir = Some(cache.path().to_path_buf());

    Coordinator::from_config(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let coordinator = Coordinator::from_config(config).unwrap();
    assert_eq!(coordinator.clear_cache().unwrap(), 1);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.cache_hits, 0);
    assert_eq!(hits(&server, "/").await, 2);
}
