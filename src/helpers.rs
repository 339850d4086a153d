//! Small string and URL helpers shared by the source adapters.
//!
//! # Examples
//!
//! ```
//! use rust_anime_scraper::helpers::{slug_from_url, extract_number};
//!
//! assert_eq!(
//!     slug_from_url("https://otakudesu.cloud/anime/1piece-sub-indo/").as_deref(),
//!     Some("1piece-sub-indo")
//! );
//! assert_eq!(extract_number("Episode 12.5 Subtitle Indonesia").as_deref(), Some("12.5"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"));
static EPISODE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:episode|eps?\.?)\s*(\d+(?:\.\d+)?)").expect("valid regex")
});

/// Last non-empty path segment of a URL or path, without query or fragment.
pub fn slug_from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.split('/')
        .rev()
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Resolve `href` against `base`; absolute hrefs pass through unchanged.
pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => format!("{}/{}", base.trim_end_matches('/'), href.trim_start_matches('/')),
    }
}

/// First number in a string.
pub fn extract_number(s: &str) -> Option<String> {
    NUMBER
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Episode number from an episode title, preferring the number after
/// "Episode"/"Eps" over any other number in the title.
pub fn episode_number(title: &str) -> Option<String> {
    EPISODE_NUMBER
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| extract_number(title))
}

/// Lower-case, hyphenated slug for a display name ("Slice of Life" -> "slice-of-life").
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Strip a site-specific suffix such as " Subtitle Indonesia" from a title.
pub fn strip_suffixes(title: &str, suffixes: &[&str]) -> String {
    let mut out = title.trim().to_string();
    for suffix in suffixes {
        let lower = out.to_lowercase();
        if lower.ends_with(&suffix.to_lowercase()) {
            out.truncate(out.len() - suffix.len());
            out = out.trim().to_string();
        }
    }
    out
}
