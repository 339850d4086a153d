//! Fallback-chain field extraction over a parsed document.
//!
//! Source markup drifts without notice, so every leaf field is described as
//! an ordered list of [`Strategy`] values. [`resolve`] walks the list and
//! returns the first non-empty normalized value, or `None` when every
//! strategy comes up empty. Resolution never fails; callers decide whether a
//! missing value is fatal.

use scraper::{ElementRef, Selector};
use serde_json::Value;

/// Where to read a value from, relative to the resolution root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Text content of elements matching the selector.
    Text(&'static str),
    /// Attribute of elements matching the selector.
    Attr(&'static str, &'static str),
    /// Text content of the root itself.
    SelfText,
    /// Attribute of the root itself.
    SelfAttr(&'static str),
}

/// Parse a CSS selector, logging instead of panicking on bad input.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            log::error!("invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Elements under `root` matching `css`, in document order.
pub fn select_all<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(s) => root.select(&s).collect(),
        None => Vec::new(),
    }
}

pub fn select_first<'a>(root: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    selector(css).and_then(|s| root.select(&s).next())
}

/// Elements matching the first selector in `candidates` that matches anything.
///
/// List containers move between theme versions; the first layout that yields
/// items wins and later candidates are not consulted.
pub fn select_any<'a>(root: ElementRef<'a>, candidates: &[&str]) -> Vec<ElementRef<'a>> {
    for css in candidates {
        let found = select_all(root, css);
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Trim, decode leftover HTML entities and collapse internal whitespace.
pub fn normalize_text(raw: &str) -> String {
    let decoded = decode_entities(raw);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// html5ever decodes entities once while parsing; double-escaped markup still
/// leaves `&amp;`-style sequences in text nodes.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&#8217;", "\u{2019}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Normalized text of one element.
pub fn text_of(el: ElementRef) -> String {
    normalize_text(&el.text().collect::<String>())
}

fn non_empty(raw: &str) -> Option<String> {
    let value = normalize_text(raw);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn evaluate(root: ElementRef, strategy: &Strategy) -> Option<String> {
    match *strategy {
        Strategy::Text(css) => select_all(root, css)
            .into_iter()
            .find_map(|el| non_empty(&el.text().collect::<String>())),
        Strategy::Attr(css, attr) => select_all(root, css)
            .into_iter()
            .find_map(|el| el.value().attr(attr).and_then(non_empty)),
        Strategy::SelfText => non_empty(&root.text().collect::<String>()),
        Strategy::SelfAttr(attr) => root.value().attr(attr).and_then(non_empty),
    }
}

/// First non-empty value produced by `strategies`, tried in order.
pub fn resolve(root: ElementRef, strategies: &[Strategy]) -> Option<String> {
    let found = strategies.iter().find_map(|s| evaluate(root, s));
    if found.is_none() {
        log::debug!("no strategy matched: {:?}", strategies);
    }
    found
}

/// Value of a `Label: value` line inside `items`, matching any of `labels`
/// case-insensitively. Info boxes render metadata this way.
pub fn labeled_value(root: ElementRef, items: &str, labels: &[&str]) -> Option<String> {
    for item in select_all(root, items) {
        let text = text_of(item);
        let Some((label, value)) = text.split_once(':') else {
            continue;
        };
        let label = label.trim().to_lowercase();
        if labels.iter().any(|l| label == l.to_lowercase()) {
            if let Some(v) = non_empty(value) {
                return Some(v);
            }
        }
    }
    None
}

/// Value cell of a two-column `<th>label</th><td>value</td>` row whose label
/// matches any of `labels` case-insensitively.
pub fn table_value(root: ElementRef, rows: &str, labels: &[&str]) -> Option<String> {
    for row in select_all(root, rows) {
        let (Some(head), Some(cell)) = (
            select_first(row, "th, td:first-child"),
            select_first(row, "td:last-child"),
        ) else {
            continue;
        };
        if head == cell {
            continue;
        }
        let label = text_of(head).trim_end_matches(':').trim().to_lowercase();
        if labels.iter().any(|l| label == l.to_lowercase()) {
            if let Some(v) = non_empty(&cell.text().collect::<String>()) {
                return Some(v);
            }
        }
    }
    None
}

/// JSON counterpart of [`resolve`] for API-backed sources: the first pointer
/// that yields a non-empty string or a number.
pub fn resolve_json(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| match value.pointer(p) {
        Some(Value::String(s)) => non_empty(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
