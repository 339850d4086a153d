//! Streaming server extraction.
//!
//! Sources expose mirrors as `<option>`/`<a>` elements whose value is an
//! opaque token. Some tokens are plain player URLs, others are base64 of an
//! `<iframe>`/`<video>` snippet or of a small JSON object; [`player_url`]
//! recovers a URL when the token carries one.

use crate::helpers::absolute_url;
use crate::models::{StreamingServer, VideoSource};
use crate::resolver::{normalize_text, resolve_json, select_all, select_first, text_of};
use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

static QUALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{3,4}p|4k|hd|sd|fhd)\b").expect("valid regex"));
static CLASS_QUALITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{3,4}p)$").expect("valid regex"));

/// Decode a base64 token, tolerating missing padding and surrounding space.
pub fn decode_base64(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let bytes = STANDARD
        .decode(trimmed)
        .or_else(|_| {
            let padded = format!("{}{}", trimmed, "=".repeat((4 - trimmed.len() % 4) % 4));
            STANDARD.decode(padded)
        })
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// Player URL embedded in an HTML snippet: `source`, `video`, `iframe` or
/// `embed` src, in that order.
pub fn url_from_snippet(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let root = fragment.root_element();
    ["source", "video", "iframe", "embed"].iter().find_map(|css| {
        select_first(root, css)
            .and_then(|el| el.value().attr("src"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Best-effort player URL for a server token.
pub fn player_url(value: &str, base_url: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.starts_with("http") || value.starts_with("//") || value.starts_with('/') {
        return Some(absolute_url(base_url, value));
    }
    let decoded = decode_base64(value)?;
    let decoded = decoded.trim();
    if decoded.contains('<') {
        return url_from_snippet(decoded).map(|u| absolute_url(base_url, &u));
    }
    if decoded.starts_with('{') {
        let json: serde_json::Value = serde_json::from_str(decoded).ok()?;
        return resolve_json(&json, &["/url", "/src", "/file", "/link"])
            .filter(|u| u.starts_with("http") || u.starts_with("//"))
            .map(|u| absolute_url(base_url, &u));
    }
    if decoded.starts_with("http") {
        return Some(decoded.to_string());
    }
    None
}

/// Split "SERVER - 720p" or "Server 720p" into name and quality.
pub fn split_quality(label: &str) -> (String, Option<String>) {
    let label = normalize_text(label);
    if let Some((name, quality)) = label.split_once(" - ") {
        return (name.trim().to_string(), Some(quality.trim().to_string()));
    }
    match QUALITY.find(&label) {
        Some(m) => {
            let name = label[..m.start()].trim().trim_end_matches('-').trim();
            let name = if name.is_empty() { label.as_str() } else { name };
            (name.to_string(), Some(m.as_str().to_string()))
        }
        None => (label, None),
    }
}

/// Where a source keeps its mirror list.
pub struct ServerLayout {
    /// One element per server.
    pub items: &'static str,
    /// Attribute holding the opaque token.
    pub value_attr: &'static str,
    /// Fall back to a quality class on an ancestor (`<ul class="m720p">`).
    pub quality_from_parent_class: bool,
}

fn is_selected(el: ElementRef) -> bool {
    let v = el.value();
    v.attr("selected").is_some() || v.classes().any(|c| c == "active" || c == "selected" || c == "on")
}

fn parent_quality(el: ElementRef) -> Option<String> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|a| {
            a.value()
                .classes()
                .find_map(|c| CLASS_QUALITY.find(c).map(|m| m.as_str().to_string()))
        })
}

/// Servers listed under `root`. Entries without a label or token are skipped.
pub fn parse_servers(root: ElementRef, layout: &ServerLayout, base_url: &str) -> Vec<StreamingServer> {
    let mut out = Vec::new();
    for el in select_all(root, layout.items) {
        let label = text_of(el);
        let Some(value) = el.value().attr(layout.value_attr).map(str::trim) else {
            continue;
        };
        if label.is_empty() || value.is_empty() {
            continue;
        }
        let (name, mut quality) = split_quality(&label);
        if quality.is_none() && layout.quality_from_parent_class {
            quality = parent_quality(el);
        }
        let video_sources = player_url(value, base_url)
            .map(|url| {
                vec![VideoSource {
                    quality: quality.clone(),
                    provider: name.clone(),
                    url,
                }]
            })
            .unwrap_or_default();
        out.push(StreamingServer {
            name: match &quality {
                Some(q) if !name.contains(q.as_str()) => format!("{} {}", name, q),
                _ => name,
            },
            value: value.to_string(),
            selected: is_selected(el),
            video_sources,
        });
    }
    out
}

/// Server for the player embedded on page load, if any.
pub fn default_server(root: ElementRef, iframe_css: &str, base_url: &str) -> Option<StreamingServer> {
    let src = select_first(root, iframe_css)?.value().attr("src")?.trim().to_string();
    if src.is_empty() {
        return None;
    }
    let url = absolute_url(base_url, &src);
    Some(StreamingServer {
        name: "Default".to_string(),
        value: url.clone(),
        selected: true,
        video_sources: vec![VideoSource {
            quality: None,
            provider: "Default".to_string(),
            url,
        }],
    })
}
