//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive full crawls
//! through the reqwest transport.

use crawl_bot::config::FilterConfig;
use crawl_bot::{CrawlPage, CrawlRequest, Crawler, CrawlerOptions, TransportError, UrlFilter};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn test_options() -> CrawlerOptions {
    CrawlerOptions {
        max_requests_per_second: 100,
        request_timeout: 5,
        user_agent: "crawl-bot-test/1.0".to_string(),
        ..CrawlerOptions::default()
    }
}

#[derive(Default)]
struct Outcome {
    successes: Vec<CrawlPage>,
    failures: Vec<CrawlPage>,
    finished: usize,
}

impl Outcome {
    fn success_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.successes.iter().map(|p| p.url.clone()).collect();
        urls.sort();
        urls
    }
}

async fn run_crawl(crawler: &mut Crawler, seed: String) -> (Vec<String>, Arc<Mutex<Outcome>>) {
    let outcome = Arc::new(Mutex::new(Outcome::default()));
    let (s, f, d) = (outcome.clone(), outcome.clone(), outcome.clone());
    let request = CrawlRequest::new(seed)
        .on_success(move |page| s.lock().unwrap().successes.push(page))
        .on_failure(move |page| f.lock().unwrap().failures.push(page))
        .on_finished(move |_| d.lock().unwrap().finished += 1);

    let crawled = crawler.crawl(request).await;
    (crawled, outcome)
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><body>
            <a href="/page1">Page 1</a>
            <a href="{}/page2">Page 2</a>
            <!-- <a href="/draft">Draft</a> -->
            </body></html>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(r#"<a href="/">Home</a> <a href="page2">Next</a>"#.to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(r#"<a href="/page1">Back</a>"#.to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draft"))
        .respond_with(html(String::new()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(test_options()).expect("Failed to create crawler");
    let (crawled, outcome) = run_crawl(&mut crawler, format!("{}/", base_url)).await;
    let outcome = outcome.lock().unwrap();

    assert_eq!(crawled.len(), 3);
    assert_eq!(
        outcome.success_urls(),
        vec![
            format!("{}/", base_url),
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
        ]
    );
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.finished, 1);
}

#[tokio::test]
async fn test_seed_without_trailing_slash_is_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r##"<a href="/">Home</a> <a href="/#top">Top</a> <a href="{}">Root</a>"##,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(test_options()).expect("Failed to create crawler");
    let (crawled, outcome) = run_crawl(&mut crawler, base_url.clone()).await;
    let outcome = outcome.lock().unwrap();

    assert_eq!(crawled, vec![format!("{}/", base_url)]);
    assert_eq!(outcome.success_urls(), vec![format!("{}/", base_url)]);
    assert_eq!(outcome.finished, 1);
}

#[tokio::test]
async fn test_redirect_is_reported_at_target() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html(r#"<a href="/old">Old</a> <a href="/new">Self</a>"#.to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(test_options()).expect("Failed to create crawler");
    let (crawled, outcome) = run_crawl(&mut crawler, format!("{}/old", base_url)).await;
    let outcome = outcome.lock().unwrap();

    assert_eq!(crawled, vec![format!("{}/new", base_url)]);
    assert_eq!(outcome.successes.len(), 1);

    let page = &outcome.successes[0];
    let response = page.response.as_ref().expect("success carries a response");
    assert_eq!(response.requested_url, format!("{}/old", base_url));
    assert_eq!(response.redirects, vec![format!("{}/new", base_url)]);
    assert!(crawler.is_known(&format!("{}/old", base_url)));
    assert!(crawler.is_known(&format!("{}/new", base_url)));
}

#[tokio::test]
async fn test_redirect_loop_is_a_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/b"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/a"))
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(test_options()).expect("Failed to create crawler");
    let (_, outcome) = run_crawl(&mut crawler, format!("{}/a", base_url)).await;
    let outcome = outcome.lock().unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].status, None);
    assert!(matches!(
        outcome.failures[0].error,
        Some(TransportError::RedirectLoop { .. })
    ));
}

#[tokio::test]
async fn test_not_found_is_a_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/missing">Missing</a>"#.to_string()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_raw("gone", "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(test_options()).expect("Failed to create crawler");
    let (crawled, outcome) = run_crawl(&mut crawler, format!("{}/", base_url)).await;
    let outcome = outcome.lock().unwrap();

    assert_eq!(crawled.len(), 2);
    assert_eq!(outcome.failures.len(), 1);

    let failure = &outcome.failures[0];
    assert_eq!(failure.url, format!("{}/missing", base_url));
    assert_eq!(failure.status, Some(404));
    assert_eq!(failure.content, "gone");
    assert_eq!(failure.referer, format!("{}/", base_url));
}

#[tokio::test]
async fn test_binary_response_is_not_scanned() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"<a href="/hidden">x</a>"#, "image/png"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html(String::new()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(test_options()).expect("Failed to create crawler");
    let (_, outcome) = run_crawl(&mut crawler, format!("{}/image", base_url)).await;
    let outcome = outcome.lock().unwrap();

    assert_eq!(outcome.successes.len(), 1);
    assert_eq!(outcome.successes[0].content, crawl_bot::crawler::BINARY_PLACEHOLDER);
}

#[tokio::test]
async fn test_request_headers() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "crawl-bot-test/1.0"))
        .respond_with(html(r#"<a href="/next">Next</a>"#.to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .and(header("user-agent", "crawl-bot-test/1.0"))
        .and(header("referer", format!("{}/", base_url).as_str()))
        .respond_with(html(String::new()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut crawler = Crawler::new(test_options()).expect("Failed to create crawler");
    let (_, outcome) = run_crawl(&mut crawler, format!("{}/", base_url)).await;

    assert_eq!(outcome.lock().unwrap().successes.len(), 2);
}

#[tokio::test]
async fn test_ignore_relative_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<a href="/relative">Relative</a>
            <a href="{}/absolute">Absolute</a>
            <a href="mailto:someone@example.com">Mail</a>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/absolute"))
        .respond_with(html(String::new()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/relative"))
        .respond_with(html(String::new()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let options = CrawlerOptions {
        ignore_relative_links: true,
        ..test_options()
    };
    let mut crawler = Crawler::new(options).expect("Failed to create crawler");
    let (crawled, _) = run_crawl(&mut crawler, format!("{}/", base_url)).await;

    assert_eq!(crawled.len(), 2);
}

#[tokio::test]
async fn test_deny_filter_blocks_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="http://blocked.invalid/">Blocked</a> <a href="/ok">Ok</a>"#.to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html(String::new()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let filter = UrlFilter::from_config(
        &FilterConfig {
            deny: vec!["*.invalid".to_string()],
            ..FilterConfig::default()
        },
        &base_url,
    )
    .expect("Failed to build filter");

    let mut crawler = Crawler::new(test_options())
        .expect("Failed to create crawler")
        .with_url_filter(filter);
    let (crawled, outcome) = run_crawl(&mut crawler, format!("{}/", base_url)).await;

    assert_eq!(crawled.len(), 2);
    assert!(outcome.lock().unwrap().failures.is_empty());
}

#[tokio::test]
async fn test_depth_one_fetches_only_seed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/child">Child</a>"#.to_string()))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(html(String::new()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut crawler =
        Crawler::new(test_options().with_depth(1)).expect("Failed to create crawler");
    let seed = format!("{}/", base_url);

    let (crawled, _) = run_crawl(&mut crawler, seed.clone()).await;
    assert_eq!(crawled, vec![seed.clone()]);

    // A known seed is not fetched again until forgotten
    let (_, outcome) = run_crawl(&mut crawler, seed.clone()).await;
    assert_eq!(outcome.lock().unwrap().finished, 1);

    crawler.forget_crawled();
    let (crawled, _) = run_crawl(&mut crawler, seed.clone()).await;
    assert_eq!(crawled, vec![seed]);
}

#[tokio::test]
async fn test_spawned_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(String::new()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::new(test_options()).expect("Failed to create crawler");
    let handle = crawler.spawn(format!("{}/", base_url));
    let crawler = handle.await.expect("crawl task panicked");

    assert_eq!(crawler.crawled_urls(), [format!("{}/", base_url)]);
}
