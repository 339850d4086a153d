use crate::config::BrowserSettings;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;

pub type BrowserResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Configuration for headless browser
#[derive(Clone, Debug)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub timeout: Duration,
    pub disable_images: bool,
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1366,
            window_height: 768,
            timeout: Duration::from_secs(30),
            disable_images: true, // Faster loading
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }
}

impl From<&BrowserSettings> for BrowserConfig {
    fn from(settings: &BrowserSettings) -> Self {
        Self {
            headless: settings.headless,
            timeout: settings.timeout(),
            disable_images: settings.disable_images,
            user_agent: Some(
                settings
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            ),
            ..Default::default()
        }
    }
}

/// Headless Chrome for pages whose content only exists after scripts run.
///
/// All calls block; async callers run them on a blocking thread.
pub struct BrowserClient {
    browser: Browser,
    config: BrowserConfig,
}

impl BrowserClient {
    pub fn with_config(config: BrowserConfig) -> BrowserResult<Self> {
        use std::ffi::OsStr;

        // Owned strings must outlive the launch options that borrow them
        let images_arg = config
            .disable_images
            .then(|| "--blink-settings=imagesEnabled=false".to_string());
        let user_agent_arg = config.user_agent.as_ref().map(|ua| format!("--user-agent={}", ua));

        let mut args: Vec<&OsStr> = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--no-sandbox"),
        ];
        if let Some(ref img) = images_arg {
            args.push(OsStr::new(img));
        }
        if let Some(ref ua) = user_agent_arg {
            args.push(OsStr::new(ua));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(config.timeout + Duration::from_secs(30))
            .args(args)
            .build()?;

        let browser = Browser::new(launch_options)?;
        Ok(Self { browser, config })
    }

    fn navigate(&self, url: &str) -> BrowserResult<Arc<Tab>> {
        log::info!("Browser navigating to: {}", url);

        let tab = self.browser.new_tab()?;
        tab.set_default_timeout(self.config.timeout);
        // Hide the most common automation marker
        tab.evaluate(
            "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });",
            false,
        )?;
        tab.navigate_to(url)?.wait_until_navigated()?;
        Ok(tab)
    }

    /// Navigate to a URL, wait for a selector, and return the page HTML
    pub fn get_html_wait_for(&self, url: &str, selector: &str) -> BrowserResult<String> {
        let tab = self.navigate(url)?;
        tab.wait_for_element_with_custom_timeout(selector, self.config.timeout)?;
        // Popover payloads are attached a moment after the element appears
        std::thread::sleep(Duration::from_millis(500));
        Ok(tab.get_content()?)
    }
}

impl Drop for BrowserClient {
    fn drop(&mut self) {
        log::debug!("Browser client dropped");
    }
}
