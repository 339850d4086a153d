//! Grouping of download links under their quality headers.
//!
//! Download sections are usually flat: a quality header ("MKV 720p (350MB)")
//! followed by one link per file host, then the next header, with no
//! structural nesting. [`flatten`] turns such markup into a [`Segment`]
//! sequence and [`group`] folds that sequence into [`DownloadGroup`]s.

use crate::models::{DownloadGroup, DownloadLink};
use crate::resolver::{normalize_text, text_of};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

static RESOLUTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{3,4})\s?p\b|\b(4k)\b|(?:^|[^a-z])(?:mp4|mkv)?(full\s?hd|fhd|hd)\b")
        .expect("valid regex")
});
// "MP4HD" glues the container to the resolution alias.
static FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(mp4|mkv|x265)(?:\b|(?:full)?hd\b|fhd\b)").expect("valid regex")
});
static SUBTITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(softsub|hardsub|raw)\b").expect("valid regex"));
static SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s?([kmg]i?b)\b").expect("valid regex"));
static SIZE_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[(\[]?\s*(?:size\s*:?\s*)?\d+(?:[.,]\d+)?\s?[kmg]i?b\s*[)\]]?$")
        .expect("valid regex")
});

pub const UNSPECIFIED: &str = "Unspecified";

/// One flattened piece of a download section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A run of non-link text: a quality header, a size, or noise.
    Text(String),
    /// Text known to be a quality header, e.g. a labelled download row.
    /// Always opens a group, even when no resolution can be read from it.
    Header(String),
    Link {
        provider: String,
        href: Option<String>,
    },
}

impl Segment {
    pub fn text(s: impl AsRef<str>) -> Self {
        Segment::Text(normalize_text(s.as_ref()))
    }

    pub fn header(s: impl AsRef<str>) -> Self {
        Segment::Header(normalize_text(s.as_ref()))
    }

    pub fn link(provider: impl AsRef<str>, href: impl Into<String>) -> Self {
        Segment::Link {
            provider: normalize_text(provider.as_ref()),
            href: Some(href.into()),
        }
    }
}

/// Parsed quality header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualityHeader {
    pub format: Option<String>,
    pub resolution: Option<String>,
    pub subtitle: Option<String>,
    pub size: Option<String>,
}

impl QualityHeader {
    pub fn label(&self) -> String {
        [&self.format, &self.resolution, &self.subtitle]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn into_group(self) -> DownloadGroup {
        DownloadGroup {
            quality: self.label(),
            format: self.format,
            resolution: self.resolution,
            subtitle: self.subtitle,
            size: self.size,
            links: Vec::new(),
        }
    }
}

/// Parse a header text. Returns `None` unless it carries a resolution token
/// ("720p", "4K", or one of the HD/FHD/FULLHD aliases).
pub fn parse_header(text: &str) -> Option<QualityHeader> {
    let caps = RESOLUTION.captures(text)?;
    let resolution = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(n), _, _) => format!("{}p", n.as_str()),
        (None, Some(_), _) => "4K".to_string(),
        (None, None, Some(alias)) if alias.as_str().eq_ignore_ascii_case("hd") => {
            "720p".to_string()
        }
        (None, None, Some(_)) => "1080p".to_string(),
        _ => return None,
    };
    let format = FORMAT.captures(text).and_then(|c| c.get(1)).map(|m| {
        let f = m.as_str();
        if f.eq_ignore_ascii_case("x265") {
            "x265".to_string()
        } else {
            f.to_uppercase()
        }
    });
    let subtitle = SUBTITLE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| capitalize(m.as_str()));
    let size = parse_size(text);

    Some(QualityHeader {
        format,
        resolution: Some(resolution),
        subtitle,
        size,
    })
}

/// First size token in `text`, e.g. "350MB" or "1.2 GB".
pub fn parse_size(text: &str) -> Option<String> {
    let caps = SIZE.captures(text)?;
    let number = caps.get(1)?.as_str();
    let unit = caps.get(2)?.as_str().to_uppercase();
    let original = caps.get(0)?.as_str();
    let sep = if original.contains(' ') { " " } else { "" };
    Some(format!("{}{}{}", number, sep, unit))
}

fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn unspecified_group() -> DownloadGroup {
    DownloadGroup {
        quality: UNSPECIFIED.to_string(),
        format: None,
        resolution: None,
        subtitle: None,
        size: None,
        links: Vec::new(),
    }
}

/// Group for an explicit header; the raw label is kept as the quality when
/// no resolution can be read from it.
fn header_group(text: &str) -> DownloadGroup {
    if let Some(header) = parse_header(text) {
        return header.into_group();
    }
    let label = SIZE.replace_all(text, "");
    let label = normalize_text(label.trim_matches(|c: char| c.is_whitespace() || "()[]".contains(c)));
    let mut group = unspecified_group();
    if !label.is_empty() {
        group.quality = label;
    }
    group.format = FORMAT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase());
    group.size = parse_size(text);
    group
}

enum State {
    AwaitingHeader,
    InGroup(DownloadGroup),
}

fn close(state: State, out: &mut Vec<DownloadGroup>) {
    if let State::InGroup(group) = state {
        if group.links.is_empty() {
            log::debug!("dropping empty download group '{}'", group.quality);
        } else {
            out.push(group);
        }
    }
}

/// Fold a flat segment sequence into download groups.
///
/// Headers open a new group, closing the previous one. [`Segment::Header`]
/// always opens one; [`Segment::Text`] only when it parses as a header.
/// Groups that end up
/// without links are dropped. Links seen before any header land in an
/// "Unspecified" group. Links missing either provider text or a target are
/// skipped. A size-only text fills in the open group's size if unset.
pub fn group(segments: &[Segment]) -> Vec<DownloadGroup> {
    let mut out = Vec::new();
    let mut state = State::AwaitingHeader;

    for segment in segments {
        match segment {
            Segment::Text(text) => {
                if let Some(header) = parse_header(text) {
                    close(std::mem::replace(&mut state, State::AwaitingHeader), &mut out);
                    state = State::InGroup(header.into_group());
                } else if SIZE_ONLY.is_match(text.trim()) {
                    if let State::InGroup(ref mut group) = state {
                        if group.size.is_none() {
                            group.size = parse_size(text);
                        }
                    }
                }
            }
            Segment::Header(text) => {
                close(std::mem::replace(&mut state, State::AwaitingHeader), &mut out);
                state = State::InGroup(header_group(text));
            }
            Segment::Link { provider, href } => {
                let href = href.as_deref().map(str::trim).unwrap_or_default();
                if provider.is_empty() || href.is_empty() {
                    log::debug!("skipping malformed download link '{}' -> '{}'", provider, href);
                    continue;
                }
                let link = DownloadLink {
                    provider: provider.clone(),
                    url: href.to_string(),
                };
                match state {
                    State::InGroup(ref mut group) => group.links.push(link),
                    State::AwaitingHeader => {
                        let mut group = unspecified_group();
                        group.links.push(link);
                        state = State::InGroup(group);
                    }
                }
            }
        }
    }
    close(state, &mut out);
    out
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "li" | "ul" | "ol" | "tr" | "td" | "th" | "table" | "section"
            | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "dt" | "dd"
    )
}

fn flush(buf: &mut String, out: &mut Vec<Segment>) {
    let text = normalize_text(buf);
    if !text.is_empty() {
        out.push(Segment::Text(text));
    }
    buf.clear();
}

fn walk(el: ElementRef, buf: &mut String, out: &mut Vec<Segment>) {
    for child in el.children() {
        if let scraper::Node::Text(t) = child.value() {
            buf.push_str(t);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        match child_el.value().name() {
            "a" => {
                flush(buf, out);
                out.push(Segment::Link {
                    provider: text_of(child_el),
                    href: child_el.value().attr("href").map(str::to_string),
                });
            }
            "br" | "hr" => flush(buf, out),
            "script" | "style" => {}
            name => {
                // Adjacent inline headers ("<span>MP4 720p</span><span>MKV 720p</span>")
                // must not merge into one text run.
                let block = is_block(name) || parse_header(&text_of(child_el)).is_some();
                if block {
                    flush(buf, out);
                }
                walk(child_el, buf, out);
                if block {
                    flush(buf, out);
                }
            }
        }
    }
}

/// Flatten the markup under `root` into segments, in document order.
/// Links become [`Segment::Link`]; text between links, block boundaries and
/// header-shaped inline elements becomes [`Segment::Text`].
pub fn flatten(root: ElementRef) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut buf = String::new();
    walk(root, &mut buf, &mut out);
    flush(&mut buf, &mut out);
    out
}
