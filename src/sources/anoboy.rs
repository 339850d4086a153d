use super::{parse_cards, parse_episode_rows, parse_genre_links, CardLayout, EpisodeRowLayout, Site};
use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::grouping::{flatten, group};
use crate::helpers::{absolute_url, slug_from_url};
use crate::models::{
    AnimeDetail, AnimeMetadata, AnimeSummary, Episode, Genre, ListPage, Navigation,
};
use crate::pagination::{normalize, scan_links, LinkLayout};
use crate::resolver::{resolve, select_any, table_value, Strategy};
use crate::streaming::{default_server, parse_servers, ServerLayout};
use scraper::{ElementRef, Html};

pub const BASE_URL: &str = "https://anoboy.show";

const CARDS: CardLayout = CardLayout {
    containers: &[".home_index a[rel='bookmark']", ".column-content a[rel='bookmark']"],
    slug_of: slug_from_url,
    link: &[Strategy::SelfAttr("href")],
    title: &[Strategy::Text("h3.ibox1"), Strategy::Text("h3"), Strategy::SelfAttr("title")],
    poster: &[
        Strategy::Attr("amp-img", "src"),
        Strategy::Attr("img", "src"),
        Strategy::Attr("img", "data-src"),
    ],
    rating: &[],
    badge: &[Strategy::Text(".jamup"), Strategy::Text(".eps")],
};

/// WP-PageNavi; the "Last »" link only carries its number in the href.
const PAGE_NAVI: LinkLayout = LinkLayout {
    links: ".wp-pagenavi a.page, .wp-pagenavi a.last",
    current: ".wp-pagenavi span.current",
    next: ".wp-pagenavi a.nextpostslink",
    prev: ".wp-pagenavi a.previouspostslink",
};

const EPISODE_ROWS: EpisodeRowLayout = EpisodeRowLayout {
    rows: &[".singlelink ul.lcp_catlist li", "ul.lcp_catlist li"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr("a", "href")],
    title: &[Strategy::Text("a")],
    number: &[],
    date: &[Strategy::Text(".lcp_date")],
};

const MIRRORS: ServerLayout = ServerLayout {
    items: ".vmiror a[data-video]",
    value_attr: "data-video",
    quality_from_parent_class: false,
};

const INFO_ROWS: &str = "table.contenttable tr";

pub struct Anoboy {
    base_url: String,
}

impl Anoboy {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url_for("anoboy", BASE_URL))
    }

    fn listing(&self, root: ElementRef, page: u32) -> ListPage<AnimeSummary> {
        let items = parse_cards(root, &CARDS, &self.base_url);
        let raw = scan_links(root, &PAGE_NAVI)
            .with_current(page)
            .with_item_count(items.len());
        ListPage {
            items,
            pagination: normalize(&raw),
        }
    }
}

impl Site for Anoboy {
    fn name(&self) -> &'static str {
        "anoboy"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self, page: u32) -> String {
        format!("{}/page/{}/", self.base_url, page)
    }

    fn parse_list(&self, body: &str, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = Html::parse_document(body);
        Ok(self.listing(doc.root_element(), page))
    }

    fn detail_url(&self, slug: &str) -> String {
        format!("{}/anime/{}/", self.base_url, slug)
    }

    fn parse_detail(&self, body: &str, slug: &str) -> Result<AnimeDetail> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let title = resolve(
            root,
            &[Strategy::Text(".pagetitle h1"), Strategy::Text("h1.entry-title")],
        )
        .ok_or_else(|| ScrapeError::MissingField {
            field: "title",
            slug: slug.to_string(),
        })?;

        let info = |labels: &[&str]| table_value(root, INFO_ROWS, labels);
        let metadata = AnimeMetadata {
            alternative_title: info(&["judul alternatif", "alternatif"]),
            status: info(&["status"]),
            kind: info(&["tipe", "type"]),
            studio: info(&["studio"]),
            season: info(&["musim", "season"]),
            duration: info(&["durasi", "duration"]),
            release_date: info(&["tanggal rilis", "rilis", "tayang"]),
            score: info(&["skor", "score", "rating"]),
            total_episodes: info(&["episode", "total episode"]),
        };

        Ok(AnimeDetail {
            summary: AnimeSummary {
                slug: slug.to_string(),
                title,
                poster: resolve(
                    root,
                    &[
                        Strategy::Attr(".column-three-fourth amp-img", "src"),
                        Strategy::Attr(".entry-content img", "src"),
                    ],
                )
                .map(|p| absolute_url(&self.base_url, &p)),
                rating: metadata.score.clone(),
                badge: metadata.kind.clone(),
                url: Some(self.detail_url(slug)),
            },
            synopsis: resolve(
                root,
                &[Strategy::Text(".contentdeks"), Strategy::Text(".entry-content p")],
            ),
            metadata,
            genres: parse_genre_links(root, "table.contenttable a[href*='/genre']"),
            episode_lists: parse_episode_rows(root, &EPISODE_ROWS),
        })
    }

    fn episode_url(&self, slug: &str) -> String {
        format!("{}/{}/", self.base_url, slug)
    }

    fn parse_episode(&self, body: &str, slug: &str) -> Result<Episode> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let title = resolve(
            root,
            &[Strategy::Text(".pagetitle h1"), Strategy::Text("h1.entry-title")],
        )
        .ok_or_else(|| ScrapeError::MissingField {
            field: "title",
            slug: slug.to_string(),
        })?;

        let mut streaming_servers: Vec<_> =
            default_server(root, "#fplay iframe, #mediaplayer iframe", &self.base_url)
                .into_iter()
                .collect();
        streaming_servers.extend(parse_servers(root, &MIRRORS, &self.base_url));

        let download_links = select_any(root, &["#colomb .download", ".download"])
            .into_iter()
            .flat_map(|section| group(&flatten(section)))
            .collect();

        let nav = |strategies: &[Strategy]| resolve(root, strategies).and_then(|h| slug_from_url(&h));
        let navigation = Navigation {
            prev_slug: nav(&[
                Strategy::Attr(".nav-previous a", "href"),
                Strategy::Attr("a[rel='prev']", "href"),
            ]),
            next_slug: nav(&[
                Strategy::Attr(".nav-next a", "href"),
                Strategy::Attr("a[rel='next']", "href"),
            ]),
            anime_slug: nav(&[
                Strategy::Attr(".breadcrumb a[href*='/anime/']", "href"),
                Strategy::Attr(".breadcrumb a[href*='/category/']", "href"),
            ]),
        };

        Ok(Episode {
            title,
            anime_title: resolve(root, &[Strategy::Text(".breadcrumb a[href*='/anime/']")]),
            streaming_servers,
            download_links,
            navigation,
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/?s={}", self.base_url, urlencoding::encode(query))
    }

    fn parse_search(&self, body: &str, _query: &str) -> Result<Vec<AnimeSummary>> {
        let doc = Html::parse_document(body);
        Ok(parse_cards(doc.root_element(), &CARDS, &self.base_url))
    }

    fn genres_url(&self) -> String {
        format!("{}/genre/", self.base_url)
    }

    fn parse_genres(&self, body: &str) -> Result<Vec<Genre>> {
        let doc = Html::parse_document(body);
        Ok(parse_genre_links(doc.root_element(), "a[href*='/genre/']"))
    }

    fn letter_url(&self, letter: char, page: u32) -> String {
        let key = if letter == '#' { "0-9".to_string() } else { letter.to_ascii_lowercase().to_string() };
        format!("{}/anime-list/{}/page/{}/", self.base_url, key, page)
    }

    fn parse_letter(&self, body: &str, _letter: char, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = Html::parse_document(body);
        Ok(self.listing(doc.root_element(), page))
    }
}
