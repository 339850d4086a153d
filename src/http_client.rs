use crate::config::HttpConfig;
use crate::error::{Result, ScrapeError};
use crate::fetch::PageRequest;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// User agents to rotate through to avoid bot detection
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// Plain HTTP GET with browser-like headers. One request per call; failures
/// are returned as-is and never retried.
pub struct HttpFetcher {
    client: Client,
    user_agent: Option<String>,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> std::result::Result<Self, reqwest::Error> {
        Self::with_config(&HttpConfig::default())
    }

    pub fn with_config(config: &HttpConfig) -> std::result::Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));

        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .cookie_store(config.enable_cookies)
            .gzip(config.enable_compression)
            .brotli(config.enable_compression)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
        })
    }

    /// Get a random user agent from the pool
    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the request URL and return the body text.
    pub async fn get_text(&self, request: &PageRequest) -> Result<String> {
        let user_agent = self
            .user_agent
            .as_deref()
            .unwrap_or_else(|| Self::random_user_agent());
        let mut builder = self.client.get(&request.url).header("User-Agent", user_agent);
        for (name, value) in &request.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(n), Ok(v)) => builder = builder.header(n, v),
                _ => log::warn!("dropping invalid header {}: {}", name, value),
            }
        }

        log::info!("GET {}", request.url);
        let response = builder.send().await.map_err(|e| transport(request, e))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("{} returned {}", request.url, status);
            return Err(ScrapeError::Status {
                operation: request.operation,
                target: request.target.clone(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| transport(request, e))
    }
}

fn transport(request: &PageRequest, e: reqwest::Error) -> ScrapeError {
    if e.is_timeout() {
        ScrapeError::Timeout {
            operation: request.operation,
            target: request.target.clone(),
        }
    } else {
        ScrapeError::Transport {
            operation: request.operation,
            target: request.target.clone(),
            source: e,
        }
    }
}
