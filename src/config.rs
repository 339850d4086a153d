use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    /// Per-source overrides keyed by source name.
    #[serde(default)]
    pub sources: HashMap<String, SourceSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Deadline for one outbound request, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Fixed user agent; a browser-like one is rotated when unset
    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default = "default_true")]
    pub enable_cookies: bool,

    /// Enable gzip/brotli compression
    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    /// Headless Chrome for script-rendered pages (requires Chrome)
    #[serde(default = "default_false")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Disable images in browser (faster loading)
    #[serde(default = "default_true")]
    pub disable_images: bool,

    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourceSettings {
    /// Mirror domain to use instead of the built-in one
    pub base_url: Option<String>,
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_timeout() -> u64 { 30 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
            enable_cookies: true,
            enable_compression: true,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: false, // Disabled by default (requires Chrome)
            headless: true,
            timeout_secs: 30,
            disable_images: true,
            user_agent: None,
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, or defaults.
    pub fn load() -> Self {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load from `path`; a missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                log::warn!("ignoring invalid {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Base URL for `source`, honouring a configured mirror.
    pub fn base_url_for(&self, source: &str, default: &str) -> String {
        self.sources
            .get(source)
            .and_then(|s| s.base_url.as_deref())
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default.to_string())
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BrowserSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
