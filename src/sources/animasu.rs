use super::{
    captioned_rows, parse_cards, parse_episode_rows, parse_genre_links, CardLayout,
    EpisodeRowLayout, Site,
};
use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::grouping::group;
use crate::helpers::{absolute_url, slug_from_url, strip_suffixes};
use crate::models::{
    AnimeDetail, AnimeMetadata, AnimeSummary, Episode, Genre, ListPage, Navigation,
};
use crate::pagination::{normalize, RawPagination};
use crate::resolver::{labeled_value, resolve, select_all, select_first, Strategy};
use crate::streaming::{default_server, parse_servers, ServerLayout};
use scraper::{ElementRef, Html};

pub const BASE_URL: &str = "https://v1.animasu.top";

const TITLE_SUFFIXES: &[&str] = &[" Sub Indo", " Subtitle Indonesia"];

const CARDS: CardLayout = CardLayout {
    containers: &[".listupd .bs .bsx", ".bs .bsx", "article.bs"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr("a", "href")],
    title: &[
        Strategy::Text(".tt"),
        Strategy::Attr("a", "title"),
        Strategy::Attr("img", "alt"),
    ],
    poster: &[
        Strategy::Attr("img", "data-src"),
        Strategy::Attr("img", "data-lazy-src"),
        Strategy::Attr("img", "src"),
    ],
    rating: &[Strategy::Text(".numscore"), Strategy::Text(".rating i")],
    badge: &[Strategy::Text(".bt .epx"), Strategy::Text(".epx")],
};

const EPISODE_ROWS: EpisodeRowLayout = EpisodeRowLayout {
    rows: &["#daftarepisode li", ".eplister ul li"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr("a", "href")],
    title: &[Strategy::Text(".lchx a"), Strategy::Text(".epl-title"), Strategy::Text("a")],
    number: &[Strategy::Text(".epl-num")],
    date: &[Strategy::Text(".epl-date"), Strategy::Text(".date")],
};

const MIRRORS: ServerLayout = ServerLayout {
    items: "select.mirror option",
    value_attr: "value",
    quality_from_parent_class: false,
};

const INFO: &str = ".infox .spe span";

pub struct Animasu {
    base_url: String,
}

impl Animasu {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url_for("animasu", BASE_URL))
    }

    /// Only "previous"/"next" controls are rendered; the total is unknown.
    fn listing(&self, root: ElementRef, page: u32) -> ListPage<AnimeSummary> {
        let items = parse_cards(root, &CARDS, &self.base_url);
        let raw = RawPagination {
            next_control: select_first(root, ".hpage a.r, .pagination a.next").is_some(),
            prev_control: select_first(root, ".hpage a.l, .pagination a.prev").is_some(),
            ..Default::default()
        }
        .with_current(page)
        .with_item_count(items.len());
        ListPage {
            items,
            pagination: normalize(&raw),
        }
    }
}

impl Site for Animasu {
    fn name(&self) -> &'static str {
        "animasu"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self, page: u32) -> String {
        format!(
            "{}/pencarian/?status=ongoing&order=update&halaman={}",
            self.base_url, page
        )
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

        let title = resolve(root, &[Strategy::Text(".infox h1"), Strategy::Text("h1.entry-title")])
            .map(|t| strip_suffixes(&t, TITLE_SUFFIXES))
            .ok_or_else(|| ScrapeError::MissingField {
                field: "title",
                slug: slug.to_string(),
            })?;

        let info = |labels: &[&str]| labeled_value(root, INFO, labels);
        let metadata = AnimeMetadata {
            alternative_title: resolve(root, &[Strategy::Text(".infox .alter")]),
            status: info(&["status"]),
            kind: info(&["jenis", "tipe", "type"]),
            studio: info(&["studio"]),
            season: info(&["musim", "season"]),
            duration: info(&["durasi", "duration"]),
            release_date: info(&["rilis", "dirilis", "released"]),
            score: resolve(root, &[Strategy::Text(".rating strong"), Strategy::Text(".numscore")])
                .map(|s| s.trim_start_matches("Rating").trim().to_string()),
            total_episodes: info(&["episode", "total episode"]),
        };

        let genres = {
            let from_info = parse_genre_links(root, ".infox .spe a[href*='genre']");
            if from_info.is_empty() {
                parse_genre_links(root, ".genxed a")
            } else {
                from_info
            }
        };

        Ok(AnimeDetail {
            summary: AnimeSummary {
                slug: slug.to_string(),
                title,
                poster: resolve(
                    root,
                    &[
                        Strategy::Attr(".bigcontent .thumb img", "data-src"),
                        Strategy::Attr(".bigcontent .thumb img", "src"),
                        Strategy::Attr(".thumb img", "src"),
                    ],
                )
                .map(|p| absolute_url(&self.base_url, &p)),
                rating: metadata.score.clone(),
                badge: metadata.kind.clone(),
                url: Some(self.detail_url(slug)),
            },
            synopsis: resolve(root, &[Strategy::Text(".sinopsis"), Strategy::Text(".entry-content")]),
            metadata,
            genres,
            episode_lists: parse_episode_rows(root, &EPISODE_ROWS),
        })
    }

    fn episode_url(&self, slug: &str) -> String {
        format!("{}/{}/", self.base_url, slug)
    }

    fn parse_episode(&self, body: &str, slug: &str) -> Result<Episode> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let title = resolve(root, &[Strategy::Text("h1.entry-title"), Strategy::Text(".megavid h1")])
            .ok_or_else(|| ScrapeError::MissingField {
                field: "title",
                slug: slug.to_string(),
            })?;

        let mut streaming_servers: Vec<_> =
            default_server(root, ".player-embed iframe, #embed_holder iframe", &self.base_url)
                .into_iter()
                .collect();
        streaming_servers.extend(parse_servers(root, &MIRRORS, &self.base_url));
        if streaming_servers.len() > 1 && streaming_servers[1..].iter().any(|s| s.selected) {
            // The page marks its own default among the mirrors.
            streaming_servers[0].selected = false;
        }

        let download_links = select_all(root, ".soraddlx, .soraddl")
            .into_iter()
            .flat_map(|block| group(&captioned_rows(block, ".sorattlx", ".soraurlx", "strong")))
            .collect();

        let nav = |strategies: &[Strategy]| resolve(root, strategies).and_then(|h| slug_from_url(&h));
        let navigation = Navigation {
            prev_slug: nav(&[Strategy::Attr(".naveps .nvs a[rel='prev']", "href")]),
            next_slug: nav(&[Strategy::Attr(".naveps .nvs a[rel='next']", "href")]),
            anime_slug: nav(&[
                Strategy::Attr(".naveps .nvsc a", "href"),
                Strategy::Attr(".ts-breadcrumb a[href*='/anime/']", "href"),
            ]),
        };

        Ok(Episode {
            title,
            anime_title: resolve(
                root,
                &[
                    Strategy::Text(".ts-breadcrumb li:nth-child(2) span"),
                    Strategy::Text(".single-info .infox h2"),
                ],
            )
            .map(|t| strip_suffixes(&t, TITLE_SUFFIXES)),
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
        format!("{}/kumpulan-genre/", self.base_url)
    }

    fn parse_genres(&self, body: &str) -> Result<Vec<Genre>> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();
        let genres = parse_genre_links(root, ".genrepage a");
        if genres.is_empty() {
            return Ok(parse_genre_links(root, "a[href*='/genre/']"));
        }
        Ok(genres)
    }

    fn letter_url(&self, letter: char, page: u32) -> String {
        let show = if letter == '#' { ".".to_string() } else { letter.to_string() };
        format!(
            "{}/daftar-anime/page/{}/?show={}",
            self.base_url,
            page,
            urlencoding::encode(&show)
        )
    }

    fn parse_letter(&self, body: &str, _letter: char, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = Html::parse_document(body);
        Ok(self.listing(doc.root_element(), page))
    }
}
