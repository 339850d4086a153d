use rust_anime_scraper::config::HttpConfig;
use rust_anime_scraper::http_client::HttpFetcher;
use rust_anime_scraper::{PageRequest, ScrapeError};
use std::time::Duration;

#[tokio::test]
async fn test_http_client_creation() {
    let client = HttpFetcher::new();
    assert!(client.is_ok(), "Failed to create HTTP client");
}

#[tokio::test]
async fn test_http_client_with_custom_config() {
    let config = HttpConfig {
        timeout_secs: 10,
        user_agent: Some("anime-scraper-test".to_string()),
        enable_cookies: false,
        enable_compression: true,
    };

    let client = HttpFetcher::with_config(&config).expect("custom config should build");
    assert_eq!(client.timeout(), Duration::from_secs(10));
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let config = HttpConfig {
        timeout_secs: 2,
        ..Default::default()
    };
    let client = HttpFetcher::with_config(&config).unwrap();
    // Port 9 (discard) is closed on loopback
    let request = PageRequest::http("list", "page 1", "http://127.0.0.1:9/ongoing/");

    let err = client.get_text(&request).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {}", err);
    assert!(err.to_string().contains("page 1"));
}

#[tokio::test]
#[ignore] // Requires internet
async fn test_fetch_success() {
    let client = HttpFetcher::new().expect("Failed to create client");
    let request = PageRequest::http("list", "page 1", "https://httpbin.org/html");

    let html = client.get_text(&request).await.expect("httpbin should answer");
    assert!(html.contains("html"), "Response should contain HTML");
}

#[tokio::test]
#[ignore] // Requires internet
async fn test_non_success_status_is_reported() {
    let client = HttpFetcher::new().expect("Failed to create client");
    let request = PageRequest::http("detail", "slug 'ghost-slug'", "https://httpbin.org/status/404");

    match client.get_text(&request).await {
        Err(ScrapeError::Status { status, target, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(target, "slug 'ghost-slug'");
        }
        other => panic!("expected a status error, got {:?}", other.map(|b| b.len())),
    }
}

#[tokio::test]
#[ignore] // Requires internet
async fn test_request_headers_are_sent() {
    let client = HttpFetcher::new().expect("Failed to create client");
    let request = PageRequest::http("list", "page 1", "https://httpbin.org/headers")
        .header("Accept", "application/json")
        .header("Referer", "https://otakudesu.cloud/");

    let body = client.get_text(&request).await.expect("httpbin should answer");
    assert!(body.contains("otakudesu.cloud"));
    assert!(body.contains("Mozilla/5.0"), "a browser-like user agent should be sent");
}
