use super::{
    parse_cards, parse_episode_rows, parse_genre_links, starts_with_letter, CardLayout,
    EpisodeRowLayout, Site,
};
use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::grouping::{flatten, group};
use crate::helpers::{absolute_url, slug_from_url, strip_suffixes};
use crate::models::{
    AnimeDetail, AnimeMetadata, AnimeSummary, Episode, Genre, ListPage, Navigation,
};
use crate::pagination::{normalize, scan_links, LinkLayout, RawPagination};
use crate::resolver::{labeled_value, resolve, select_all, select_any, text_of, Strategy};
use crate::streaming::{default_server, parse_servers, ServerLayout};
use scraper::Html;

pub const BASE_URL: &str = "https://otakudesu.cloud";

const TITLE_SUFFIXES: &[&str] = &[" Subtitle Indonesia", " Sub Indo"];

const ONGOING_CARDS: CardLayout = CardLayout {
    containers: &[".venz ul li", ".rseries .venz li", ".detpost"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr(".thumb a", "href"), Strategy::Attr("a", "href")],
    title: &[Strategy::Text("h2.jdlflm"), Strategy::Text(".thumbz h2")],
    poster: &[Strategy::Attr("img", "src"), Strategy::Attr("img", "data-src")],
    rating: &[],
    badge: &[Strategy::Text(".epz")],
};

const SEARCH_CARDS: CardLayout = CardLayout {
    containers: &["ul.chivsrc li"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr("h2 a", "href")],
    title: &[Strategy::Text("h2 a"), Strategy::Text("h2")],
    poster: &[Strategy::Attr("img", "src")],
    rating: &[],
    badge: &[],
};

const PAGE_LINKS: LinkLayout = LinkLayout {
    links: ".pagination a.page-numbers",
    current: ".pagination span.current",
    next: ".pagination a.next",
    prev: ".pagination a.prev",
};

const EPISODE_ROWS: EpisodeRowLayout = EpisodeRowLayout {
    rows: &[".episodelist ul li"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr("span a", "href"), Strategy::Attr("a", "href")],
    title: &[Strategy::Text("span a"), Strategy::Text("a")],
    number: &[],
    date: &[Strategy::Text(".zeebr")],
};

const SERVERS: ServerLayout = ServerLayout {
    items: ".mirrorstream ul li a",
    value_attr: "data-content",
    quality_from_parent_class: true,
};

const INFO: &str = ".infozingle p";

pub struct Otakudesu {
    base_url: String,
}

impl Otakudesu {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url_for("otakudesu", BASE_URL))
    }

    fn info(&self, root: scraper::ElementRef, labels: &[&str]) -> Option<String> {
        labeled_value(root, INFO, labels)
    }
}

impl Site for Otakudesu {
    fn name(&self) -> &'static str {
        "otakudesu"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self, page: u32) -> String {
        format!("{}/ongoing-anime/page/{}/", self.base_url, page)
    }

    fn parse_list(&self, body: &str, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();
        let items = parse_cards(root, &ONGOING_CARDS, &self.base_url);
        let raw = scan_links(root, &PAGE_LINKS)
            .with_current(page)
            .with_item_count(items.len());
        Ok(ListPage {
            items,
            pagination: normalize(&raw),
        })
    }

    fn detail_url(&self, slug: &str) -> String {
        format!("{}/anime/{}/", self.base_url, slug)
    }

    fn parse_detail(&self, body: &str, slug: &str) -> Result<AnimeDetail> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let title = self
            .info(root, &["judul"])
            .or_else(|| resolve(root, &[Strategy::Text(".jdlrx h1"), Strategy::Text("h1.posttl")]))
            .map(|t| strip_suffixes(&t, TITLE_SUFFIXES))
            .ok_or_else(|| ScrapeError::MissingField {
                field: "title",
                slug: slug.to_string(),
            })?;

        let poster = resolve(
            root,
            &[
                Strategy::Attr(".fotoanime img", "src"),
                Strategy::Attr(".fotoanime img", "data-src"),
            ],
        )
        .map(|p| absolute_url(&self.base_url, &p));

        let synopsis = resolve(root, &[Strategy::Text(".sinopc"), Strategy::Text(".sinopsis")]);

        let metadata = AnimeMetadata {
            alternative_title: self.info(root, &["japanese"]),
            status: self.info(root, &["status"]),
            kind: self.info(root, &["tipe", "type"]),
            studio: self.info(root, &["studio"]),
            season: self.info(root, &["musim", "season"]),
            duration: self.info(root, &["durasi", "duration"]),
            release_date: self.info(root, &["tanggal rilis", "rilis"]),
            score: self.info(root, &["skor", "score"]),
            total_episodes: self.info(root, &["total episode"]),
        };

        let genres = parse_genre_links(root, ".infozingle a[href*='/genres/']");
        let episode_lists = parse_episode_rows(root, &EPISODE_ROWS)
            .into_iter()
            .filter(|e| e.slug != slug)
            .collect();

        Ok(AnimeDetail {
            summary: AnimeSummary {
                slug: slug.to_string(),
                title,
                poster,
                rating: metadata.score.clone(),
                badge: metadata.kind.clone(),
                url: Some(self.detail_url(slug)),
            },
            synopsis,
            metadata,
            genres,
            episode_lists,
        })
    }

    fn episode_url(&self, slug: &str) -> String {
        format!("{}/episode/{}/", self.base_url, slug)
    }

    fn parse_episode(&self, body: &str, slug: &str) -> Result<Episode> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let title = resolve(root, &[Strategy::Text("h1.posttl"), Strategy::Text(".venutama h1")])
            .ok_or_else(|| ScrapeError::MissingField {
                field: "title",
                slug: slug.to_string(),
            })?;

        let anime_title = self
            .info(root, &["judul"])
            .map(|t| strip_suffixes(&t, TITLE_SUFFIXES));

        let mut streaming_servers: Vec<_> =
            default_server(root, "#pembed iframe", &self.base_url).into_iter().collect();
        streaming_servers.extend(parse_servers(root, &SERVERS, &self.base_url));

        let download_links = select_any(root, &[".download", ".download-eps"])
            .into_iter()
            .flat_map(|section| group(&flatten(section)))
            .collect();

        let nav_slug = |strategies: &[Strategy]| resolve(root, strategies).and_then(|h| slug_from_url(&h));
        let navigation = Navigation {
            prev_slug: nav_slug(&[
                Strategy::Attr(".flir a[title='Episode Sebelumnya']", "href"),
                Strategy::Attr(".prevnext a[rel='prev']", "href"),
            ]),
            next_slug: nav_slug(&[
                Strategy::Attr(".flir a[title='Episode Selanjutnya']", "href"),
                Strategy::Attr(".prevnext a[rel='next']", "href"),
            ]),
            anime_slug: nav_slug(&[Strategy::Attr(".flir a[href*='/anime/']", "href")]),
        };

        Ok(Episode {
            title,
            anime_title,
            streaming_servers,
            download_links,
            navigation,
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/?s={}&post_type=anime",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    fn parse_search(&self, body: &str, _query: &str) -> Result<Vec<AnimeSummary>> {
        let doc = Html::parse_document(body);
        Ok(parse_cards(doc.root_element(), &SEARCH_CARDS, &self.base_url))
    }

    fn genres_url(&self) -> String {
        format!("{}/genre-list/", self.base_url)
    }

    fn parse_genres(&self, body: &str) -> Result<Vec<Genre>> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();
        let genres = parse_genre_links(root, "ul.genres li a");
        if genres.is_empty() {
            return Ok(parse_genre_links(root, "a[href*='/genres/']"));
        }
        Ok(genres)
    }

    fn letter_url(&self, _letter: char, _page: u32) -> String {
        // The whole A-Z index is one page.
        format!("{}/anime-list/", self.base_url)
    }

    fn parse_letter(&self, body: &str, letter: char, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let mut items = Vec::new();
        if page == 1 {
            for block in select_all(root, ".bariskelom") {
                let heading = resolve(block, &[Strategy::Text(".barispenz")]).unwrap_or_default();
                if heading.chars().next().map(|c| c.to_ascii_uppercase()) != Some(letter) {
                    continue;
                }
                for a in select_all(block, ".jdlbar a") {
                    let title = text_of(a);
                    let Some(href) = a.value().attr("href") else {
                        continue;
                    };
                    let url = absolute_url(&self.base_url, href);
                    if let (Some(slug), false) = (slug_from_url(&url), title.is_empty()) {
                        items.push(AnimeSummary {
                            slug,
                            title,
                            url: Some(url),
                            ..Default::default()
                        });
                    }
                }
            }
            // Older markup lists every title in one column without letter blocks.
            if items.is_empty() {
                items = parse_cards(
                    root,
                    &CardLayout {
                        containers: &["#abtext .jdlbar", ".daftarkartun .jdlbar"],
                        slug_of: slug_from_url,
                        link: &[Strategy::Attr("a", "href")],
                        title: &[Strategy::Text("a")],
                        poster: &[],
                        rating: &[],
                        badge: &[],
                    },
                    &self.base_url,
                )
                .into_iter()
                .filter(|s| starts_with_letter(&s.title, letter))
                .collect();
            }
        }

        let raw = RawPagination::default()
            .with_current(page)
            .with_item_count(items.len());
        Ok(ListPage {
            items,
            pagination: normalize(&raw),
        })
    }
}
