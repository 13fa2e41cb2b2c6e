mod common;

use common::quotes_page;
use quotely::*;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(timeout: Duration) -> HttpFetcher {
    HttpFetcher::new(timeout, "quotely-test").unwrap()
}

fn url_on(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_returns_body_and_url() {
    let server = MockServer::start().await;
    serve(&server, "/page/1/", quotes_page(1, 3, None, None)).await;

    let page = fetcher(Duration::from_secs(5))
        .fetch(&url_on(&server, "/page/1/"))
        .await
        .unwrap();

    assert_eq!(page.url(), &url_on(&server, "/page/1/"));
    assert_eq!(extract(&page).items.len(), 3);
}

#[tokio::test]
async fn test_error_statuses_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let fetcher = fetcher(Duration::from_secs(5));

    let missing = fetcher.fetch(&url_on(&server, "/missing/")).await;
    let broken = fetcher.fetch(&url_on(&server, "/broken/")).await;

    assert!(matches!(missing, Err(FetchError::Status { status: 404, .. })));
    assert!(matches!(broken, Err(FetchError::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let result = fetcher(Duration::from_millis(100))
        .fetch(&url_on(&server, "/slow/"))
        .await;

    match result {
        Err(error @ FetchError::Timeout { .. }) => {
            assert!(error.url().ends_with("/slow/"));
        }
        other => panic!("Expected timeout, got {:?}", other.map(|page| page.url().clone())),
    }
}

#[tokio::test]
async fn test_redirect_reports_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/page/1/"))
        .mount(&server)
        .await;
    serve(&server, "/page/1/", quotes_page(1, 1, None, None)).await;

    let page = fetcher(Duration::from_secs(5))
        .fetch(&url_on(&server, "/"))
        .await
        .unwrap();

    assert_eq!(page.url().path(), "/page/1/");
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/1/"))
        .and(header("user-agent", "quotely-test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(Duration::from_secs(5))
        .fetch(&url_on(&server, "/page/1/"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_preconfigured_client_drives_the_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/1/"))
        .and(header("accept-language", "en"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(quotes_page(1, 4, None, None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        reqwest::header::HeaderValue::from_static("en"),
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .unwrap();
    let crawler = Crawler::builder()
        .fetcher(Arc::new(HttpFetcher::with_client(client)))
        .build()
        .unwrap();
    let spider = Arc::new(QuoteSpider::new([format!("{}/page/1/", server.uri())]));

    let (quotes, stats) = crawler.crawl(spider).await.unwrap().collect_all().await;

    assert_eq!(quotes.len(), 4);
    assert_eq!(stats.errors_encountered, 0);
}

#[tokio::test]
async fn test_crawl_over_http_fetches_each_page_once() {
    let server = MockServer::start().await;
    serve(&server, "/page/1/", quotes_page(1, 10, None, Some("/page/2/"))).await;
    serve(&server, "/page/2/", quotes_page(2, 10, Some("/page/1/"), Some("/page/3/"))).await;
    serve(&server, "/page/3/", quotes_page(3, 10, Some("/page/2/"), None)).await;

    let crawler = Crawler::builder()
        .crawling_concurrency(2)
        .request_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let spider = Arc::new(QuoteSpider::new([format!("{}/page/1/", server.uri())]));

    let (quotes, stats) = crawler.crawl(spider).await.unwrap().collect_all().await;

    assert_eq!(quotes.len(), 30);
    assert_eq!(stats.urls_visited, 3);
    assert_eq!(stats.errors_encountered, 0);
    // Mock expectations are verified when the server drops
}

#[tokio::test]
async fn test_refused_connection_fails_the_crawl() {
    let crawler = Crawler::builder()
        .request_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let spider = Arc::new(QuoteSpider::new(["http://127.0.0.1:1/page/1/"]));

    let result = crawler.crawl(spider).await;

    match result {
        Err(CrawlError::SeedUnreachable { source, .. }) => {
            assert!(matches!(source, FetchError::Transport { .. }));
        }
        Err(other) => panic!("Expected SeedUnreachable, got {}", other),
        Ok(_) => panic!("Expected SeedUnreachable"),
    }
}
