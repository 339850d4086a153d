//! Fetch abstraction shared by every source.
//!
//! Adapters describe what they need as a [`PageRequest`]; whether a page must
//! be rendered by a browser is a property of the request
//! ([`FetchMode::Rendered`]), so the heavier browser dependency is only
//! touched by the operations that need it.

use crate::browser_client::{BrowserClient, BrowserConfig};
use crate::config::{BrowserSettings, Config};
use crate::error::{Result, ScrapeError};
use crate::http_client::HttpFetcher;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    /// Plain HTTP GET.
    Http,
    /// Headless-browser navigation; the snapshot is taken once `wait_for`
    /// matches.
    Rendered { wait_for: &'static str },
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: String,
    pub mode: FetchMode,
    pub headers: Vec<(&'static str, String)>,
    /// Operation name used in error messages ("list", "detail", ...).
    pub operation: &'static str,
    /// Identifier used in error messages ("page 2", "slug 'naruto'", ...).
    pub target: String,
}

impl PageRequest {
    pub fn http(operation: &'static str, target: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: FetchMode::Http,
            headers: Vec::new(),
            operation,
            target: target.into(),
        }
    }

    pub fn rendered(
        operation: &'static str,
        target: impl Into<String>,
        url: impl Into<String>,
        wait_for: &'static str,
    ) -> Self {
        Self {
            mode: FetchMode::Rendered { wait_for },
            ..Self::http(operation, target, url)
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Cloneable cancellation flag. Cancelling before a fetch completes makes it
/// return [`ScrapeError::Cancelled`]; parsing is never interrupted.
#[derive(Clone, Debug)]
pub struct Cancellation {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`Cancellation::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // The sender lives as long as any clone of self.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability to turn a [`PageRequest`] into raw markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest, cancel: &Cancellation) -> Result<String>;
}

/// Default fetcher: HTTP for plain requests, headless Chrome for rendered
/// ones, each bounded by its configured deadline.
pub struct SourceFetcher {
    http: HttpFetcher,
    browser: BrowserSettings,
}

impl SourceFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let http = HttpFetcher::with_config(&config.http)
            .map_err(|e| ScrapeError::Config(format!("could not build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            browser: config.browser.clone(),
        })
    }

    async fn render(&self, request: &PageRequest, wait_for: &'static str) -> Result<String> {
        if !self.browser.enabled {
            return Err(ScrapeError::Browser {
                operation: request.operation,
                target: request.target.clone(),
                message: format!(
                    "{} needs a rendered page but the browser is disabled (set browser.enabled)",
                    request.url
                ),
            });
        }
        let config = BrowserConfig::from(&self.browser);
        let url = request.url.clone();
        let joined = tokio::task::spawn_blocking(move || {
            BrowserClient::with_config(config)
                .and_then(|browser| browser.get_html_wait_for(&url, wait_for))
                .map_err(|e| e.to_string())
        })
        .await;

        let browser_err = |message: String| ScrapeError::Browser {
            operation: request.operation,
            target: request.target.clone(),
            message,
        };
        match joined {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(message)) => Err(browser_err(message)),
            Err(e) => Err(browser_err(format!("browser task failed: {}", e))),
        }
    }

    fn deadline(&self, mode: &FetchMode) -> Duration {
        match mode {
            FetchMode::Http => self.http.timeout(),
            FetchMode::Rendered { .. } => self.browser.timeout() * 2,
        }
    }
}

#[async_trait]
impl PageFetcher for SourceFetcher {
    async fn fetch(&self, request: &PageRequest, cancel: &Cancellation) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(cancelled(request));
        }
        let work = async {
            match request.mode {
                FetchMode::Http => self.http.get_text(request).await,
                FetchMode::Rendered { wait_for } => self.render(request, wait_for).await,
            }
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(cancelled(request)),
            outcome = tokio::time::timeout(self.deadline(&request.mode), work) => {
                outcome.unwrap_or_else(|_| {
                    log::warn!("deadline exceeded for {}", request.url);
                    Err(ScrapeError::Timeout {
                        operation: request.operation,
                        target: request.target.clone(),
                    })
                })
            }
        }
    }
}

fn cancelled(request: &PageRequest) -> ScrapeError {
    ScrapeError::Cancelled {
        operation: request.operation,
        target: request.target.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_request_keeps_metadata() {
        let req = PageRequest::rendered("detail", "slug 'x'", "https://s.test/x", "#episodes")
            .header("Referer", "https://s.test/");
        assert_eq!(req.mode, FetchMode::Rendered { wait_for: "#episodes" });
        assert_eq!(req.operation, "detail");
        assert_eq!(req.headers.len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_resolves() {
        let cancel = Cancellation::new();
        let clone = cancel.clone();
        assert!(!cancel.is_cancelled());
        let waiter = tokio::spawn(async move { clone.cancelled().await });
        cancel.cancel();
        waiter.await.unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let fetcher = SourceFetcher::new(&Config::default()).unwrap();
        let cancel = Cancellation::new();
        cancel.cancel();
        let req = PageRequest::http("list", "page 1", "http://127.0.0.1:9/never");
        let err = fetcher.fetch(&req, &cancel).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_rendered_fetch_requires_enabled_browser() {
        let fetcher = SourceFetcher::new(&Config::default()).unwrap();
        let req = PageRequest::rendered("detail", "slug 'x'", "https://s.test/x", "body");
        let err = fetcher.fetch(&req, &Cancellation::new()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Browser { .. }));
        assert!(err.to_string().contains("slug 'x'"));
    }
}
