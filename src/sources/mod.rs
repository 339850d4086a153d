//! Source adapters.
//!
//! Each site module implements [`Site`]: URL builders plus pure parsers over
//! the fetched body. [`Adapter`] pairs a site with a [`PageFetcher`] and
//! exposes the caller-facing [`SourceAdapter`] operations, each returning an
//! [`Envelope`].

pub mod animasu;
pub mod anoboy;
pub mod jikan;
pub mod kuramanime;
pub mod otakudesu;
pub mod samehadaku;

use crate::envelope::Envelope;
use crate::error::{Result, ScrapeError};
use crate::fetch::{Cancellation, PageFetcher, PageRequest};
use crate::config::Config;
use crate::grouping::Segment;
use crate::helpers::{absolute_url, slug_from_url, slugify};
use crate::models::{AnimeDetail, AnimeSummary, Episode, EpisodeRef, Genre, ListPage};
use crate::resolver::{resolve, select_all, select_any, text_of, Strategy};
use async_trait::async_trait;
use scraper::ElementRef;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Detail,
    Episode,
    Search,
    Genres,
    ByLetter,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Detail => "detail",
            Operation::Episode => "episode",
            Operation::Search => "search",
            Operation::Genres => "genres",
            Operation::ByLetter => "by_letter",
        }
    }
}

/// Markup knowledge for one source. Parsers are synchronous and pure so they
/// can be exercised against fixture markup.
pub trait Site: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn base_url(&self) -> &str;

    /// Selector to wait for when `op` needs a script-rendered page.
    fn rendered_dom(&self, _op: Operation) -> Option<&'static str> {
        None
    }

    /// Extra request headers sent with every fetch.
    fn headers(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn list_url(&self, page: u32) -> String;
    fn parse_list(&self, body: &str, page: u32) -> Result<ListPage<AnimeSummary>>;

    fn detail_url(&self, slug: &str) -> String;
    fn parse_detail(&self, body: &str, slug: &str) -> Result<AnimeDetail>;

    fn episode_url(&self, slug: &str) -> String;
    fn parse_episode(&self, body: &str, slug: &str) -> Result<Episode>;

    fn search_url(&self, query: &str) -> String;
    fn parse_search(&self, body: &str, query: &str) -> Result<Vec<AnimeSummary>>;

    fn genres_url(&self) -> String;
    fn parse_genres(&self, body: &str) -> Result<Vec<Genre>>;

    fn letter_url(&self, letter: char, page: u32) -> String;
    fn parse_letter(&self, body: &str, letter: char, page: u32) -> Result<ListPage<AnimeSummary>>;
}

/// The uniform operation set every source exposes.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn base_url(&self) -> &str;

    async fn list(&self, page: u32, cancel: &Cancellation) -> Envelope<ListPage<AnimeSummary>>;
    async fn detail(&self, slug: &str, cancel: &Cancellation) -> Envelope<AnimeDetail>;
    async fn episode(&self, slug: &str, cancel: &Cancellation) -> Envelope<Episode>;
    async fn search(&self, query: &str, cancel: &Cancellation) -> Envelope<Vec<AnimeSummary>>;
    async fn genres(&self, cancel: &Cancellation) -> Envelope<Vec<Genre>>;
    async fn by_letter(
        &self,
        letter: char,
        page: u32,
        cancel: &Cancellation,
    ) -> Envelope<ListPage<AnimeSummary>>;
}

pub struct Adapter<S: Site> {
    site: S,
    fetcher: Arc<dyn PageFetcher>,
}

impl<S: Site> Adapter<S> {
    pub fn new(site: S, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { site, fetcher }
    }

    pub fn site(&self) -> &S {
        &self.site
    }

    fn request(&self, op: Operation, target: String, url: String) -> PageRequest {
        let mut request = match self.site.rendered_dom(op) {
            Some(wait_for) => PageRequest::rendered(op.as_str(), target, url, wait_for),
            None => PageRequest::http(op.as_str(), target, url),
        };
        for (name, value) in self.site.headers() {
            request = request.header(name, value);
        }
        request
    }

    async fn run<T, F>(
        &self,
        op: Operation,
        target: String,
        url: String,
        cancel: &Cancellation,
        parse: F,
    ) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T> + Send,
        T: Send,
    {
        let request = self.request(op, target, url);
        let body = self.fetcher.fetch(&request, cancel).await?;
        parse(&body)
    }
}

fn rejected<T>(e: ScrapeError) -> Envelope<T> {
    Envelope::from(Err::<T, ScrapeError>(e))
}

fn require_slug(op: Operation, slug: &str) -> Result<String> {
    let slug = slug.trim().trim_matches('/');
    if slug.is_empty() {
        return Err(ScrapeError::InvalidInput {
            operation: op.as_str(),
            message: "slug must not be empty".to_string(),
        });
    }
    Ok(slug.to_string())
}

/// Upper-case A-Z letter, or `#` for the numeric/symbol bucket.
pub fn normalize_letter(letter: char) -> Result<char> {
    let upper = letter.to_ascii_uppercase();
    if upper.is_ascii_uppercase() || upper == '#' {
        Ok(upper)
    } else if upper.is_ascii_digit() {
        Ok('#')
    } else {
        Err(ScrapeError::InvalidInput {
            operation: Operation::ByLetter.as_str(),
            message: format!("'{}' is not a letter A-Z or '#'", letter),
        })
    }
}

#[async_trait]
impl<S: Site> SourceAdapter for Adapter<S> {
    fn name(&self) -> &'static str {
        self.site.name()
    }

    fn base_url(&self) -> &str {
        self.site.base_url()
    }

    async fn list(&self, page: u32, cancel: &Cancellation) -> Envelope<ListPage<AnimeSummary>> {
        let page = page.max(1);
        self.run(
            Operation::List,
            format!("page {}", page),
            self.site.list_url(page),
            cancel,
            |body| self.site.parse_list(body, page),
        )
        .await
        .into()
    }

    async fn detail(&self, slug: &str, cancel: &Cancellation) -> Envelope<AnimeDetail> {
        let slug = match require_slug(Operation::Detail, slug) {
            Ok(s) => s,
            Err(e) => return rejected(e),
        };
        self.run(
            Operation::Detail,
            format!("slug '{}'", slug),
            self.site.detail_url(&slug),
            cancel,
            |body| self.site.parse_detail(body, &slug),
        )
        .await
        .into()
    }

    async fn episode(&self, slug: &str, cancel: &Cancellation) -> Envelope<Episode> {
        let slug = match require_slug(Operation::Episode, slug) {
            Ok(s) => s,
            Err(e) => return rejected(e),
        };
        self.run(
            Operation::Episode,
            format!("episode '{}'", slug),
            self.site.episode_url(&slug),
            cancel,
            |body| self.site.parse_episode(body, &slug),
        )
        .await
        .into()
    }

    async fn search(&self, query: &str, cancel: &Cancellation) -> Envelope<Vec<AnimeSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Envelope::success(Vec::new());
        }
        self.run(
            Operation::Search,
            format!("query '{}'", query),
            self.site.search_url(query),
            cancel,
            |body| self.site.parse_search(body, query),
        )
        .await
        .into()
    }

    async fn genres(&self, cancel: &Cancellation) -> Envelope<Vec<Genre>> {
        self.run(
            Operation::Genres,
            "genre index".to_string(),
            self.site.genres_url(),
            cancel,
            |body| self.site.parse_genres(body),
        )
        .await
        .into()
    }

    async fn by_letter(
        &self,
        letter: char,
        page: u32,
        cancel: &Cancellation,
    ) -> Envelope<ListPage<AnimeSummary>> {
        let letter = match normalize_letter(letter) {
            Ok(l) => l,
            Err(e) => return rejected(e),
        };
        let page = page.max(1);
        self.run(
            Operation::ByLetter,
            format!("letter '{}' page {}", letter, page),
            self.site.letter_url(letter, page),
            cancel,
            |body| self.site.parse_letter(body, letter, page),
        )
        .await
        .into()
    }
}

/// Field strategies for one catalogue card layout.
pub struct CardLayout {
    /// Candidate card containers; the first that matches anything is used.
    pub containers: &'static [&'static str],
    /// Slug from the card's absolute URL.
    pub slug_of: fn(&str) -> Option<String>,
    pub link: &'static [Strategy],
    pub title: &'static [Strategy],
    pub poster: &'static [Strategy],
    pub rating: &'static [Strategy],
    pub badge: &'static [Strategy],
}

/// Summary cards under `root`. Cards without a link or title are skipped.
pub fn parse_cards(root: ElementRef, layout: &CardLayout, base_url: &str) -> Vec<AnimeSummary> {
    let mut out = Vec::new();
    for card in select_any(root, layout.containers) {
        let Some(href) = resolve(card, layout.link) else {
            log::debug!("card without link skipped");
            continue;
        };
        let url = absolute_url(base_url, &href);
        let (Some(slug), Some(title)) = ((layout.slug_of)(&url), resolve(card, layout.title)) else {
            log::debug!("card without slug or title skipped: {}", url);
            continue;
        };
        out.push(AnimeSummary {
            slug,
            title,
            poster: resolve(card, layout.poster).map(|p| absolute_url(base_url, &p)),
            rating: resolve(card, layout.rating),
            badge: resolve(card, layout.badge),
            url: Some(url),
        });
    }
    out
}

/// Genre links under `root`, de-duplicated by slug in document order.
pub fn parse_genre_links(root: ElementRef, css: &str) -> Vec<Genre> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for a in select_all(root, css) {
        let name = text_of(a);
        if name.is_empty() {
            continue;
        }
        let slug = a
            .value()
            .attr("href")
            .and_then(slug_from_url)
            .unwrap_or_else(|| slugify(&name));
        if seen.insert(slug.clone()) {
            out.push(Genre { name, slug });
        }
    }
    out
}

/// Field strategies for one episode-list row.
pub struct EpisodeRowLayout {
    pub rows: &'static [&'static str],
    pub slug_of: fn(&str) -> Option<String>,
    pub link: &'static [Strategy],
    pub title: &'static [Strategy],
    pub number: &'static [Strategy],
    pub date: &'static [Strategy],
}

/// Episode rows under `root`; rows without a link are skipped. The number
/// falls back to the one embedded in the title.
pub fn parse_episode_rows(root: ElementRef, layout: &EpisodeRowLayout) -> Vec<EpisodeRef> {
    let mut out = Vec::new();
    for row in select_any(root, layout.rows) {
        let Some(slug) = resolve(row, layout.link).and_then(|h| (layout.slug_of)(&h)) else {
            continue;
        };
        let title = resolve(row, layout.title).unwrap_or_else(|| slug.clone());
        let episode_number = resolve(row, layout.number)
            .and_then(|n| crate::helpers::extract_number(&n))
            .or_else(|| crate::helpers::episode_number(&title));
        out.push(EpisodeRef {
            episode_number,
            title,
            slug,
            release_date: resolve(row, layout.date),
        });
    }
    out
}

/// Path below `marker`, for sources whose slugs span several segments
/// (`/anime/2310/one-piece` -> `2310/one-piece`).
pub fn path_after(url: &str, marker: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let (_, rest) = path.split_once(marker)?;
    let rest = rest.trim_matches('/');
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Whether `title` files under `letter` in an A-Z index (`#` covers titles
/// that do not start with a letter).
pub fn starts_with_letter(title: &str, letter: char) -> bool {
    match title.trim().chars().next() {
        Some(first) if letter == '#' => !first.is_ascii_alphabetic(),
        Some(first) => first.to_ascii_uppercase() == letter,
        None => false,
    }
}

/// Keep only the titles filed under `letter`. When the source page mixed in
/// other titles the total page count no longer describes the filtered
/// listing, so `last_page` becomes unknown while more pages remain.
pub fn filter_by_letter(mut listing: ListPage<AnimeSummary>, letter: char) -> ListPage<AnimeSummary> {
    let before = listing.items.len();
    listing.items.retain(|s| starts_with_letter(&s.title, letter));
    if listing.items.len() < before {
        let p = &mut listing.pagination;
        p.last_page = if p.has_next_page { None } else { Some(p.current_page) };
    }
    listing
}

/// Segments for download blocks that split the quality header across a
/// block caption ("MKV") and per-row labels ("720p"). Each row becomes
/// one header segment followed by its links.
pub fn captioned_rows(
    block: ElementRef,
    caption: &str,
    rows: &str,
    label: &str,
) -> Vec<Segment> {
    let caption = crate::resolver::select_first(block, caption)
        .map(text_of)
        .unwrap_or_default();
    let mut out = Vec::new();
    for row in select_all(block, rows) {
        let label = crate::resolver::select_first(row, label)
            .map(text_of)
            .unwrap_or_default();
        out.push(Segment::header(format!("{} {}", caption, label)));
        for a in select_all(row, "a") {
            out.push(Segment::Link {
                provider: text_of(a),
                href: a.value().attr("href").map(str::to_string),
            });
        }
    }
    out
}

/// Every configured source, addressable by name or alias.
pub struct Registry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    aliases: HashMap<&'static str, &'static str>,
}

impl Registry {
    /// Adapters backed by the default HTTP/browser fetcher.
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher = crate::fetch::SourceFetcher::new(config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Self {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(Adapter::new(otakudesu::Otakudesu::from_config(config), fetcher.clone())),
            Arc::new(Adapter::new(samehadaku::Samehadaku::from_config(config), fetcher.clone())),
            Arc::new(Adapter::new(anoboy::Anoboy::from_config(config), fetcher.clone())),
            Arc::new(Adapter::new(kuramanime::Kuramanime::from_config(config), fetcher.clone())),
            Arc::new(Adapter::new(animasu::Animasu::from_config(config), fetcher.clone())),
            Arc::new(Adapter::new(jikan::Jikan::from_config(config), fetcher)),
        ];
        let aliases = HashMap::from([
            ("otaku", "otakudesu"),
            ("same", "samehadaku"),
            ("kura", "kuramanime"),
            ("mal", "jikan"),
            ("myanimelist", "jikan"),
        ]);
        Self { adapters, aliases }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn SourceAdapter>> {
        let key = name.trim().to_lowercase();
        let canonical = self.aliases.get(key.as_str()).copied().unwrap_or(key.as_str());
        self.adapters
            .iter()
            .find(|a| a.name() == canonical)
            .cloned()
            .ok_or_else(|| ScrapeError::UnknownSource(name.to_string()))
    }

    /// Canonical source names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_letter() {
        assert_eq!(normalize_letter('a').unwrap(), 'A');
        assert_eq!(normalize_letter('#').unwrap(), '#');
        assert_eq!(normalize_letter('7').unwrap(), '#');
        assert!(normalize_letter('!').is_err());
    }

    #[test]
    fn test_require_slug() {
        assert_eq!(require_slug(Operation::Detail, " /naruto/ ").unwrap(), "naruto");
        assert!(require_slug(Operation::Detail, "  ").is_err());
    }

    #[test]
    fn test_path_after() {
        assert_eq!(
            path_after("https://k.test/anime/2310/one-piece/episode/3?x=1", "/anime/").as_deref(),
            Some("2310/one-piece/episode/3")
        );
        assert_eq!(path_after("https://k.test/anime/", "/anime/"), None);
        assert_eq!(path_after("https://k.test/genre/x", "/anime/"), None);
    }

    #[test]
    fn test_starts_with_letter() {
        assert!(starts_with_letter("naruto", 'N'));
        assert!(starts_with_letter("86 Eighty-Six", '#'));
        assert!(!starts_with_letter("Bleach", '#'));
        assert!(!starts_with_letter("", 'A'));
    }

    #[test]
    fn test_filter_by_letter_drops_stale_total() {
        let card = |title: &str| AnimeSummary {
            slug: slugify(title),
            title: title.to_string(),
            ..Default::default()
        };
        let listing = ListPage {
            items: vec![card("Naruto"), card("Nana"), card("One Piece")],
            pagination: crate::pagination::normalize(&crate::pagination::RawPagination {
                current_page: Some(3),
                last_page: Some(120),
                ..Default::default()
            }),
        };
        let filtered = filter_by_letter(listing.clone(), 'N');
        assert_eq!(filtered.items.len(), 2);
        assert_eq!(filtered.pagination.last_page, None);
        assert!(filtered.pagination.has_next_page);
        assert_eq!(filtered.pagination.next_page, Some(4));

        let untouched = filter_by_letter(
            ListPage {
                items: vec![card("Naruto")],
                pagination: listing.pagination.clone(),
            },
            'N',
        );
        assert_eq!(untouched.pagination.last_page, Some(120));
    }

    #[test]
    fn test_captioned_rows_feed_grouping() {
        let html = r#"<div class="download-eps">
            <p><b>MKV</b></p>
            <ul>
                <li><strong>480p</strong><span><a href="https://gd.test/1">GoogleDrive</a></span></li>
                <li><strong>720p</strong><span><a href="https://gd.test/2">GoogleDrive</a></span><span><a href="https://pd.test/2">Pixeldrain</a></span></li>
            </ul>
        </div>"#;
        let doc = scraper::Html::parse_fragment(html);
        let block = crate::resolver::select_first(doc.root_element(), ".download-eps").unwrap();
        let groups = crate::grouping::group(&captioned_rows(block, "p", "li", "strong"));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].quality, "MKV 480p");
        assert_eq!(groups[1].links.len(), 2);
    }

    #[test]
    fn test_registry_aliases() {
        let registry = Registry::with_fetcher(
            &Config::default(),
            Arc::new(crate::fetch::SourceFetcher::new(&Config::default()).unwrap()),
        );
        assert_eq!(registry.get("otaku").unwrap().name(), "otakudesu");
        assert_eq!(registry.get("MAL").unwrap().name(), "jikan");
        assert_eq!(registry.names().len(), 6);
        assert!(matches!(
            registry.get("nope").err(),
            Some(ScrapeError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_parse_genre_links_dedupes() {
        let html = r#"<div>
            <a href="/genres/action/">Action</a>
            <a href="/genres/action/">Action</a>
            <a>Slice of Life</a>
            <a href="/genres/drama/"> </a>
        </div>"#;
        let doc = scraper::Html::parse_fragment(html);
        let genres = parse_genre_links(doc.root_element(), "a");
        assert_eq!(
            genres,
            vec![
                Genre { name: "Action".into(), slug: "action".into() },
                Genre { name: "Slice of Life".into(), slug: "slice-of-life".into() },
            ]
        );
    }
}
