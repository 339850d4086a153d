//! Normalization of the different ways sources expose paging.
//!
//! Sources report paging as explicit flags and totals (API sources), as a
//! bare "next" control with no known total, or as a rendered list of
//! page-number links. Adapters fill in whatever they can observe in a
//! [`RawPagination`] and [`normalize`] turns it into one [`PaginationInfo`].
//!
//! When several total-page aliases are present the precedence is
//! `last_page`, then `total_pages`, then `last_visible_page`, then the
//! largest page number seen in the link list.

use crate::models::PaginationInfo;
use crate::resolver::{select_all, select_first, text_of};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use serde::Deserialize;

static PAGE_IN_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:/page/|[?&]page=)(\d+)").expect("valid regex"));
static PAGE_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:page|halaman)\s+(\d+)\s+(?:of|dari)\s+(\d+)").expect("valid regex")
});

/// Everything a source can tell us about paging. All fields are optional;
/// API payloads deserialize straight into this.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawPagination {
    pub current_page: Option<u32>,
    pub last_page: Option<u32>,
    pub total_pages: Option<u32>,
    pub last_visible_page: Option<u32>,
    pub has_next_page: Option<bool>,
    pub has_previous_page: Option<bool>,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    /// A "next" control is rendered.
    #[serde(skip)]
    pub next_control: bool,
    /// A "previous" control is rendered.
    #[serde(skip)]
    pub prev_control: bool,
    /// Page numbers found in the rendered page-link list.
    #[serde(skip)]
    pub page_links: Vec<u32>,
    /// Number of items on the page, when the adapter knows it.
    #[serde(skip)]
    pub item_count: Option<usize>,
}

impl RawPagination {
    pub fn with_current(mut self, page: u32) -> Self {
        if self.current_page.is_none() {
            self.current_page = Some(page);
        }
        self
    }

    pub fn with_item_count(mut self, count: usize) -> Self {
        self.item_count = Some(count);
        self
    }
}

/// CSS layout of a page-link navigation block.
#[derive(Debug, Clone, Copy)]
pub struct LinkLayout {
    /// Elements whose text or href carries a page number.
    pub links: &'static str,
    /// The highlighted current-page item.
    pub current: &'static str,
    pub next: &'static str,
    pub prev: &'static str,
}

/// Read a rendered page-link list into a [`RawPagination`].
pub fn scan_links(root: ElementRef, layout: &LinkLayout) -> RawPagination {
    let mut raw = RawPagination::default();

    for el in select_all(root, layout.links) {
        if let Some(n) = page_number_of(el) {
            raw.page_links.push(n);
        }
    }
    if let Some(current) = select_first(root, layout.current) {
        if let Ok(n) = text_of(current).parse::<u32>() {
            raw.current_page = Some(n);
            raw.page_links.push(n);
        }
    }
    raw.next_control = select_first(root, layout.next).is_some();
    raw.prev_control = select_first(root, layout.prev).is_some();
    raw
}

fn page_number_of(el: ElementRef) -> Option<u32> {
    if let Ok(n) = text_of(el).replace(',', "").parse::<u32>() {
        return Some(n);
    }
    // "Last »" style links only carry the number in their target.
    el.value()
        .attr("href")
        .and_then(|href| PAGE_IN_HREF.captures(href))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse "Page 3 of 120" (or the Indonesian "Halaman 3 dari 120").
pub fn parse_page_of(text: &str) -> Option<(u32, u32)> {
    let caps = PAGE_OF.captures(text)?;
    let current = caps.get(1)?.as_str().parse().ok()?;
    let last = caps.get(2)?.as_str().parse().ok()?;
    Some((current, last))
}

/// Turn whatever the source exposed into canonical pagination.
pub fn normalize(raw: &RawPagination) -> PaginationInfo {
    if raw.item_count == Some(0) {
        return PaginationInfo::single_page();
    }

    let current = raw.current_page.filter(|p| *p >= 1).unwrap_or(1);

    let mut last = raw
        .last_page
        .or(raw.total_pages)
        .or(raw.last_visible_page)
        .filter(|p| *p >= 1)
        .or_else(|| raw.page_links.iter().copied().max());
    if let Some(l) = last {
        last = Some(l.max(current));
    }

    let has_next = match raw.has_next_page {
        Some(flag) => flag,
        None => raw.next_control || last.map(|l| current < l).unwrap_or(false),
    };
    let next_page = if has_next {
        Some(raw.next_page.filter(|p| *p > current).unwrap_or(current + 1))
    } else {
        None
    };
    // An explicit "has next" flag outranks a stale total.
    if let (Some(n), Some(l)) = (next_page, last) {
        if n > l {
            last = Some(n);
        }
    }

    let has_prev = match raw.has_previous_page {
        Some(flag) => flag,
        None => raw.prev_control || current > 1,
    } && current > 1;
    let previous_page = if has_prev {
        Some(
            raw.previous_page
                .filter(|p| *p >= 1 && *p < current)
                .unwrap_or(current - 1),
        )
    } else {
        None
    };

    PaginationInfo {
        current_page: current,
        last_page: last,
        has_previous_page: has_prev,
        has_next_page: has_next,
        previous_page,
        next_page,
    }
}
