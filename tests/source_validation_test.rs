/// Live source validation
/// Walks every registered source through list -> detail -> episode and
/// reports which ones still parse. Layout drift shows up here first.
use rust_anime_scraper::config::Config;
use rust_anime_scraper::{Cancellation, Registry, SourceAdapter};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Clone)]
struct SourceTestResult {
    source_name: String,
    status: String,
    anime_count: usize,
    episode_count: usize,
    server_count: usize,
    duration_ms: u128,
    error: Option<String>,
    sample_titles: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TestReport {
    timestamp_secs: u64,
    total_sources: usize,
    working_sources: usize,
    failed_sources: usize,
    results: Vec<SourceTestResult>,
}

fn classify(message: &str) -> &'static str {
    if message.contains("HTTP 403") {
        "FORBIDDEN"
    } else if message.contains("HTTP 404") {
        "NOT_FOUND"
    } else if message.contains("timed out") {
        "TIMEOUT"
    } else if message.contains("dns") || message.contains("resolve") {
        "DNS_ERROR"
    } else if message.contains("browser") {
        "BROWSER_ERROR"
    } else {
        "ERROR"
    }
}

async fn validate(adapter: Arc<dyn SourceAdapter>) -> SourceTestResult {
    let cancel = Cancellation::new();
    let start = Instant::now();
    let mut result = SourceTestResult {
        source_name: adapter.name().to_string(),
        status: "WORKING".to_string(),
        anime_count: 0,
        episode_count: 0,
        server_count: 0,
        duration_ms: 0,
        error: None,
        sample_titles: vec![],
    };

    let fail = |mut result: SourceTestResult, status: &str, message: String| {
        result.status = status.to_string();
        result.error = Some(message);
        result.duration_ms = start.elapsed().as_millis();
        result
    };

    let listing = adapter.list(1, &cancel).await;
    let Some(page) = listing.data else {
        let message = listing.message.unwrap_or_default();
        return fail(result, classify(&message), message);
    };
    result.anime_count = page.items.len();
    result.sample_titles = page.items.iter().take(3).map(|a| a.title.clone()).collect();
    let Some(first) = page.items.first() else {
        return fail(result, "NO_DATA", "listing returned no items".to_string());
    };

    let detail = adapter.detail(&first.slug, &cancel).await;
    let Some(detail) = detail.data else {
        let message = detail.message.unwrap_or_default();
        return fail(result, classify(&message), message);
    };
    result.episode_count = detail.episode_lists.len();

    if let Some(episode_ref) = detail.episode_lists.first() {
        let episode = adapter.episode(&episode_ref.slug, &cancel).await;
        match episode.data {
            Some(episode) => result.server_count = episode.streaming_servers.len(),
            None => {
                let message = episode.message.unwrap_or_default();
                return fail(result, classify(&message), message);
            }
        }
    }

    result.duration_ms = start.elapsed().as_millis();
    result
}

fn print_summary_table(results: &[SourceTestResult]) {
    println!(
        "\n{:<12} {:<14} {:>6} {:>9} {:>8} {:>8}",
        "SOURCE", "STATUS", "ANIME", "EPISODES", "SERVERS", "MS"
    );
    for r in results {
        println!(
            "{:<12} {:<14} {:>6} {:>9} {:>8} {:>8}",
            r.source_name, r.status, r.anime_count, r.episode_count, r.server_count, r.duration_ms
        );
        if let Some(err) = &r.error {
            println!("    {}", err);
        }
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test --test source_validation_test -- --ignored --nocapture
async fn test_all_sources_comprehensive() {
    let config = Config::load();
    let registry = Registry::new(&config).expect("registry should build");

    let mut results = Vec::new();
    for name in registry.names() {
        println!("Testing {}...", name);
        let adapter = registry.get(name).expect("registered name resolves");
        results.push(validate(adapter).await);
    }

    let working = results.iter().filter(|r| r.status == "WORKING").count();
    let total = results.len();
    let report = TestReport {
        timestamp_secs: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
        total_sources: total,
        working_sources: working,
        failed_sources: total - working,
        results: results.clone(),
    };

    print_summary_table(&results);

    if let Ok(json) = serde_json::to_string_pretty(&report) {
        if let Err(e) = std::fs::write("source_validation_report.json", json) {
            eprintln!("Failed to write report: {}", e);
        } else {
            println!("\nFull report saved to: source_validation_report.json");
        }
    }

    println!("\nWorking sources: {}/{}", working, total);
    assert_eq!(total, 6);
}

#[tokio::test]
#[ignore] // Requires internet
async fn test_jikan_search_and_letter() {
    let registry = Registry::new(&Config::default()).unwrap();
    let jikan = registry.get("mal").unwrap();
    let cancel = Cancellation::new();

    let search = jikan.search("frieren", &cancel).await;
    let hits = search.data.expect("search should succeed");
    assert!(hits.iter().any(|a| a.title.to_lowercase().contains("frieren")));

    let letter = jikan.by_letter('f', 1, &cancel).await;
    let page = letter.data.expect("letter listing should succeed");
    assert!(!page.items.is_empty());
    assert_eq!(page.pagination.current_page, 1);
}
