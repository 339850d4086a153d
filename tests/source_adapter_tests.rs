/// Adapter behaviour against canned pages
/// No network: every fetch is served from an in-memory page map
use async_trait::async_trait;
use rust_anime_scraper::config::Config;
use rust_anime_scraper::fetch::FetchMode;
use rust_anime_scraper::sources::jikan::Jikan;
use rust_anime_scraper::sources::{kuramanime, otakudesu, Adapter};
use rust_anime_scraper::{
    Cancellation, PageFetcher, PageRequest, Registry, Result, ScrapeError, SourceAdapter, Status,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Serves fixed bodies by URL and records every request it sees.
#[derive(Default)]
struct StaticFetcher {
    pages: HashMap<String, String>,
    seen: Mutex<Vec<PageRequest>>,
}

impl StaticFetcher {
    fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    fn requests(&self) -> Vec<PageRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, request: &PageRequest, cancel: &Cancellation) -> Result<String> {
        self.seen.lock().unwrap().push(request.clone());
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled {
                operation: request.operation,
                target: request.target.clone(),
            });
        }
        self.pages
            .get(&request.url)
            .cloned()
            .ok_or_else(|| ScrapeError::Status {
                operation: request.operation,
                target: request.target.clone(),
                status: 404,
            })
    }
}

fn registry(fetcher: StaticFetcher) -> (Registry, Arc<StaticFetcher>) {
    let fetcher = Arc::new(fetcher);
    let registry = Registry::with_fetcher(&Config::default(), fetcher.clone());
    (registry, fetcher)
}

fn otakudesu_url(path: &str) -> String {
    format!("{}{}", otakudesu::BASE_URL, path)
}

const FRIEREN: &str = r#"<html><body>
    <div class="fotoanime"><img src="/wp-content/frieren.jpg">
    <div class="infozingle">
        <p><span><b>Judul</b>: Sousou no Frieren</span></p>
        <p><span><b>Tipe</b>: TV</span></p>
        <p><span><b>Genre</b>: <a href="/genres/fantasy/">Fantasy</a></span></p>
    </div></div>
    <div class="episodelist"><ul>
        <li><span><a href="/episode/snf-episode-1-sub-indo/">Sousou no Frieren Episode 1 Subtitle Indonesia</a></span><span class="zeebr">29 September,2023</span></li>
    </ul></div>
</body></html>"#;

#[tokio::test]
async fn test_empty_listing_is_single_page() {
    let (registry, _) = registry(
        StaticFetcher::default().with_page(
            &otakudesu_url("/ongoing-anime/page/1/"),
            "<html><body><div class=\"venz\"><ul></ul></div></body></html>",
        ),
    );
    let adapter = registry.get("otakudesu").unwrap();

    let envelope = adapter.list(1, &Cancellation::new()).await;

    assert_eq!(
        envelope.to_json(),
        r#"{"status":"success","data":{"items":[],"pagination":{"current_page":1,"last_page":1,"has_previous_page":false,"has_next_page":false,"previous_page":null,"next_page":null}}}"#
    );
}

#[tokio::test]
async fn test_page_zero_is_clamped() {
    let (registry, fetcher) = registry(StaticFetcher::default());
    let adapter = registry.get("otakudesu").unwrap();

    let _ = adapter.list(0, &Cancellation::new()).await;

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.ends_with("/ongoing-anime/page/1/"));
}

#[tokio::test]
async fn test_missing_title_names_the_slug() {
    let (registry, _) = registry(StaticFetcher::default().with_page(
        &otakudesu_url("/anime/ghost-slug/"),
        "<html><body><h2>Halaman tidak ditemukan</h2></body></html>",
    ));
    let adapter = registry.get("otakudesu").unwrap();

    let envelope = adapter.detail("ghost-slug", &Cancellation::new()).await;

    assert_eq!(envelope.status, Status::Error);
    assert!(envelope.data.is_none());
    assert!(envelope.message.unwrap().contains("ghost-slug"));
}

#[tokio::test]
async fn test_detail_is_deterministic() {
    let (registry, _) = registry(
        StaticFetcher::default().with_page(&otakudesu_url("/anime/frieren-sub-indo/"), FRIEREN),
    );
    let adapter = registry.get("otaku").unwrap();
    let cancel = Cancellation::new();

    let first = adapter.detail("frieren-sub-indo", &cancel).await;
    let second = adapter.detail("frieren-sub-indo", &cancel).await;

    assert!(first.is_success());
    assert_eq!(first.to_json(), second.to_json());
    let detail = first.data.unwrap();
    assert_eq!(detail.summary.title, "Sousou no Frieren");
    assert_eq!(detail.episode_lists[0].slug, "snf-episode-1-sub-indo");
    assert_eq!(detail.genres[0].slug, "fantasy");
}

#[tokio::test]
async fn test_fetch_failure_becomes_error_envelope() {
    let (registry, _) = registry(StaticFetcher::default());
    let adapter = registry.get("samehadaku").unwrap();

    let envelope = adapter.episode("naruto-episode-1", &Cancellation::new()).await;

    assert_eq!(envelope.status, Status::Error);
    assert!(envelope.data.is_none());
    let message = envelope.message.unwrap();
    assert!(message.contains("404"));
    assert!(message.contains("naruto-episode-1"));
    let genres = adapter.genres(&Cancellation::new()).await;
    let json: serde_json::Value = serde_json::from_str(&genres.to_json()).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["data"].is_null());
}

#[tokio::test]
async fn test_input_validation_skips_fetch() {
    let (registry, fetcher) = registry(StaticFetcher::default());
    let adapter = registry.get("anoboy").unwrap();
    let cancel = Cancellation::new();

    let detail = adapter.detail("  ", &cancel).await;
    assert_eq!(detail.status, Status::Error);

    let episode = adapter.episode("/", &cancel).await;
    assert_eq!(episode.status, Status::Error);

    let letter = adapter.by_letter('?', 1, &cancel).await;
    assert_eq!(letter.status, Status::Error);

    let search = adapter.search("   ", &cancel).await;
    assert!(search.is_success());
    assert_eq!(search.data.unwrap().len(), 0);

    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_source() {
    let (registry, _) = registry(StaticFetcher::default());
    let err = match registry.get("crunchyroll") {
        Err(e) => e,
        Ok(_) => panic!("crunchyroll should not be registered"),
    };
    assert!(matches!(err, ScrapeError::UnknownSource(_)));
    assert_eq!(
        registry.names(),
        vec!["otakudesu", "samehadaku", "anoboy", "kuramanime", "animasu", "jikan"]
    );
}

#[tokio::test]
async fn test_rendered_detail_routes_through_browser_mode() {
    let (registry, fetcher) = registry(StaticFetcher::default());
    let adapter = registry.get("kura").unwrap();
    let cancel = Cancellation::new();

    let _ = adapter.detail("2310/one-piece", &cancel).await;
    let _ = adapter.list(1, &cancel).await;

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].url.ends_with("/anime/2310/one-piece"));
    assert_eq!(requests[0].mode, FetchMode::Rendered { wait_for: "#episodeLists" });
    assert_eq!(requests[0].operation, "detail");
    assert_eq!(requests[1].mode, FetchMode::Http);
}

#[tokio::test]
async fn test_cancelled_request_reports_cancellation() {
    let (registry, _) = registry(
        StaticFetcher::default().with_page(&otakudesu_url("/anime/frieren-sub-indo/"), FRIEREN),
    );
    let adapter = registry.get("otakudesu").unwrap();
    let cancel = Cancellation::new();
    cancel.cancel();

    let envelope = adapter.detail("frieren-sub-indo", &cancel).await;

    assert_eq!(envelope.status, Status::Error);
    assert!(envelope.message.unwrap().contains("cancelled"));
}

#[tokio::test]
async fn test_api_source_sends_json_accept_header() {
    let fetcher = Arc::new(StaticFetcher::default().with_page(
        "https://api.test/v4/genres/anime",
        r#"{"data":[{"mal_id":1,"name":"Action"},{"mal_id":2,"name":"Adventure"}]}"#,
    ));
    let adapter = Adapter::new(Jikan::new("https://api.test/v4/"), fetcher.clone());

    let envelope = adapter.genres(&Cancellation::new()).await;

    let genres = envelope.data.unwrap();
    assert_eq!(genres.len(), 2);
    assert_eq!(genres[0].name, "Action");
    assert_eq!(genres[0].slug, "1");
    let request = &fetcher.requests()[0];
    assert!(request
        .headers
        .iter()
        .any(|(k, v)| *k == "Accept" && v == "application/json"));
}

#[tokio::test]
async fn test_api_source_rejects_non_json() {
    let fetcher = Arc::new(StaticFetcher::default().with_page(
        "https://api.test/v4/seasons/now?page=1",
        "<html>Service Unavailable</html>",
    ));
    let adapter = Adapter::new(Jikan::new("https://api.test/v4"), fetcher);

    let envelope = adapter.list(1, &Cancellation::new()).await;

    assert_eq!(envelope.status, Status::Error);
    assert!(envelope.message.unwrap().contains("page 1"));
}

#[tokio::test]
async fn test_configured_mirror_is_used() {
    let config = Config::parse(
        r#"
[sources.otakudesu]
base_url = "https://mirror.test/"
"#,
    )
    .unwrap();
    let fetcher = Arc::new(StaticFetcher::default());
    let registry = Registry::with_fetcher(&config, fetcher.clone());
    let adapter = registry.get("otakudesu").unwrap();

    assert_eq!(adapter.base_url(), "https://mirror.test");
    let _ = adapter.genres(&Cancellation::new()).await;
    assert!(fetcher.requests()[0].url.starts_with("https://mirror.test/"));
}

#[tokio::test]
async fn test_letter_listing_on_search_backed_source() {
    let url = format!("{}/anime?search=N&order_by=text&page=1", kuramanime::BASE_URL);
    let body = r##"<html><body><div id="animeList">
        <div class="product__item"><div class="product__item__text"><h5><a href="/anime/12/ansatsu-kyoushitsu">Ansatsu Kyoushitsu</a></h5></div></div>
        <div class="product__item"><div class="product__item__text"><h5><a href="/anime/20/naruto">Naruto</a></h5></div></div>
        <div class="product__item"><div class="product__item__text"><h5><a href="/anime/31/nana">Nana</a></h5></div></div>
    </div>
    <div class="product__pagination">
        <a class="page__link current-page" href="#">1</a>
        <a class="page__link" href="?page=120">120</a>
        <a id="nextPage" class="page__link" href="?page=2">&raquo;</a>
    </div></body></html>"##;
    let (registry, fetcher) = registry(StaticFetcher::default().with_page(&url, body));
    let adapter = registry.get("kuramanime").unwrap();

    let envelope = adapter.by_letter('n', 1, &Cancellation::new()).await;

    assert_eq!(fetcher.requests()[0].url, url);
    let page = envelope.data.unwrap();
    let titles: Vec<_> = page.items.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Naruto", "Nana"]);
    assert_eq!(page.pagination.last_page, None);
    assert!(page.pagination.has_next_page);
}

#[tokio::test]
async fn test_api_search_failure_names_query() {
    let fetcher = Arc::new(StaticFetcher::default().with_page(
        "https://api.test/v4/anime?q=frieren&limit=25&sfw=true",
        "<html>Service Unavailable</html>",
    ));
    let adapter = Adapter::new(Jikan::new("https://api.test/v4"), fetcher);

    let envelope = adapter.search("frieren", &Cancellation::new()).await;

    assert_eq!(envelope.status, Status::Error);
    assert!(envelope.message.unwrap().contains("query 'frieren'"));
}
