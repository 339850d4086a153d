/// Browser client tests
/// These tests require Chrome/Chromium to be installed
/// Run with: cargo test --test browser_client_tests -- --ignored
use rust_anime_scraper::browser_client::{BrowserClient, BrowserConfig};
use rust_anime_scraper::config::Config;
use rust_anime_scraper::{Cancellation, PageFetcher, PageRequest, SourceFetcher};
use std::time::Duration;

fn config() -> BrowserConfig {
    BrowserConfig {
        headless: true,
        window_width: 1280,
        window_height: 720,
        timeout: Duration::from_secs(15),
        disable_images: true,
        user_agent: Some("Test User Agent".to_string()),
    }
}

#[test]
#[ignore] // Requires Chrome/Chromium
fn test_browser_with_config() {
    let result = BrowserClient::with_config(config());
    assert!(
        result.is_ok(),
        "Failed to create browser. Is Chrome/Chromium installed?"
    );
}

#[test]
#[ignore] // Requires Chrome/Chromium and internet
fn test_wait_for_selector() {
    let browser = BrowserClient::with_config(config()).expect("Chrome/Chromium not installed");

    let html = browser
        .get_html_wait_for("https://example.com", "h1")
        .expect("Failed to navigate to example.com");

    assert!(html.contains("Example Domain"), "Page content not as expected");
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium and internet
async fn test_rendered_request_through_source_fetcher() {
    let mut settings = Config::default();
    settings.browser.enabled = true;
    settings.browser.timeout_secs = 20;
    let fetcher = SourceFetcher::new(&settings).unwrap();

    let request = PageRequest::rendered("detail", "slug 'example'", "https://example.com", "h1");
    let html = fetcher
        .fetch(&request, &Cancellation::new())
        .await
        .expect("rendered fetch should succeed");

    assert!(html.contains("Example Domain"));
}
