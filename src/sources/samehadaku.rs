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
    StreamingServer,
};
use crate::pagination::{normalize, parse_page_of, RawPagination};
use crate::resolver::{labeled_value, resolve, select_all, select_first, text_of, Strategy};
use scraper::{ElementRef, Html};

pub const BASE_URL: &str = "https://samehadaku.email";

const TITLE_SUFFIXES: &[&str] = &[" Sub Indo", " Subtitle Indonesia"];

const LATEST_CARDS: CardLayout = CardLayout {
    containers: &[".post-show ul li", ".post-show article"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr(".dtla h2 a", "href"), Strategy::Attr(".thumb a", "href")],
    title: &[Strategy::Text(".dtla h2 a"), Strategy::Text("h2.entry-title")],
    poster: &[Strategy::Attr(".thumb img", "src"), Strategy::Attr("img", "data-src")],
    rating: &[],
    badge: &[Strategy::Text(".dtla span")],
};

const BROWSE_CARDS: CardLayout = CardLayout {
    containers: &[".relat article.animpost", "article.animpost", ".animpost"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr(".animposx a", "href"), Strategy::Attr("a", "href")],
    title: &[
        Strategy::Text(".data .title h2"),
        Strategy::Text(".title h2"),
        Strategy::Attr("a", "title"),
    ],
    poster: &[Strategy::Attr("img", "src"), Strategy::Attr("img", "data-src")],
    rating: &[Strategy::Text(".score")],
    badge: &[Strategy::Text(".type")],
};

const EPISODE_ROWS: EpisodeRowLayout = EpisodeRowLayout {
    rows: &[".lstepsiode ul li", ".episodelist ul li"],
    slug_of: slug_from_url,
    link: &[Strategy::Attr(".epsleft .lchx a", "href"), Strategy::Attr("a", "href")],
    title: &[Strategy::Text(".epsleft .lchx a"), Strategy::Text("a")],
    number: &[Strategy::Text(".epsright .eps a"), Strategy::Text(".eps")],
    date: &[Strategy::Text(".epsleft .date"), Strategy::Text(".date")],
};

const INFO: &str = ".infoanime .spe span, .anim-senct .spe span";

pub struct Samehadaku {
    base_url: String,
}

impl Samehadaku {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url_for("samehadaku", BASE_URL))
    }

    /// "Page X of Y" plus the arrow controls.
    fn pagination(root: ElementRef, page: u32, count: usize) -> RawPagination {
        let mut raw = RawPagination::default();
        if let Some((current, last)) = select_all(root, ".pagination span")
            .into_iter()
            .find_map(|el| parse_page_of(&text_of(el)))
        {
            raw.current_page = Some(current);
            raw.last_page = Some(last);
        }
        raw.next_control = select_first(root, ".pagination #nextpagination, .pagination a.next").is_some();
        raw.prev_control = select_first(root, ".pagination #prevpagination, .pagination a.prev").is_some();
        raw.with_current(page).with_item_count(count)
    }

    fn browse(&self, body: &str, page: u32) -> ListPage<AnimeSummary> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();
        let items = parse_cards(root, &BROWSE_CARDS, &self.base_url);
        let raw = Self::pagination(root, page, items.len());
        ListPage {
            items,
            pagination: normalize(&raw),
        }
    }

    fn servers(root: ElementRef) -> Vec<StreamingServer> {
        select_all(root, "#server ul li div.east_player_option, .east_player_option")
            .into_iter()
            .filter_map(|opt| {
                let v = opt.value();
                let (post, nume) = (v.attr("data-post")?, v.attr("data-nume")?);
                let kind = v.attr("data-type").unwrap_or("schtml");
                let name = text_of(opt);
                if name.is_empty() {
                    return None;
                }
                Some(StreamingServer {
                    name,
                    // Resolved by the site's admin-ajax player endpoint.
                    value: format!("{}:{}:{}", post, nume, kind),
                    selected: v.classes().any(|c| c == "on"),
                    video_sources: Vec::new(),
                })
            })
            .collect()
    }
}

impl Site for Samehadaku {
    fn name(&self) -> &'static str {
        "samehadaku"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn list_url(&self, page: u32) -> String {
        format!("{}/anime-terbaru/page/{}/", self.base_url, page)
    }

    fn parse_list(&self, body: &str, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();
        let items = parse_cards(root, &LATEST_CARDS, &self.base_url);
        let raw = Self::pagination(root, page, items.len());
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

        let title = resolve(
            root,
            &[
                Strategy::Text(".infox h1.entry-title"),
                Strategy::Text("h1.entry-title"),
                Strategy::Text(".infoanime h2.entry-title"),
            ],
        )
        .map(|t| strip_suffixes(&t, TITLE_SUFFIXES))
        .ok_or_else(|| ScrapeError::MissingField {
            field: "title",
            slug: slug.to_string(),
        })?;

        let info = |labels: &[&str]| labeled_value(root, INFO, labels);
        let metadata = AnimeMetadata {
            alternative_title: info(&["japanese", "synonyms"]),
            status: info(&["status"]),
            kind: info(&["type"]),
            studio: info(&["studio"]),
            season: info(&["season"]),
            duration: info(&["duration"]),
            release_date: info(&["released", "released on"]),
            score: resolve(
                root,
                &[
                    Strategy::Text("span[itemprop='ratingValue']"),
                    Strategy::Text(".rating strong"),
                ],
            ),
            total_episodes: info(&["total episode"]),
        };

        Ok(AnimeDetail {
            summary: AnimeSummary {
                slug: slug.to_string(),
                title,
                poster: resolve(
                    root,
                    &[
                        Strategy::Attr(".infoanime .thumb img", "src"),
                        Strategy::Attr(".thumb img", "data-src"),
                    ],
                )
                .map(|p| absolute_url(&self.base_url, &p)),
                rating: metadata.score.clone(),
                badge: metadata.kind.clone(),
                url: Some(self.detail_url(slug)),
            },
            synopsis: resolve(
                root,
                &[
                    Strategy::Text(".desc .entry-content"),
                    Strategy::Text(".entry-content-single"),
                ],
            ),
            metadata,
            genres: parse_genre_links(root, ".genre-info a"),
            episode_lists: parse_episode_rows(root, &EPISODE_ROWS),
        })
    }

    fn episode_url(&self, slug: &str) -> String {
        format!("{}/{}/", self.base_url, slug)
    }

    fn parse_episode(&self, body: &str, slug: &str) -> Result<Episode> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let title = resolve(root, &[Strategy::Text("h1.entry-title"), Strategy::Text(".lm h1")])
            .ok_or_else(|| ScrapeError::MissingField {
                field: "title",
                slug: slug.to_string(),
            })?;

        let download_links = select_all(root, ".download-eps")
            .into_iter()
            .flat_map(|block| group(&captioned_rows(block, "p", "li", "strong")))
            .collect();

        let nav = |strategies: &[Strategy]| resolve(root, strategies).and_then(|h| slug_from_url(&h));
        let navigation = Navigation {
            prev_slug: nav(&[
                Strategy::Attr(".naveps .nvs:not(.rght) a", "href"),
                Strategy::Attr("a[rel='prev']", "href"),
            ]),
            next_slug: nav(&[
                Strategy::Attr(".naveps .nvs.rght a", "href"),
                Strategy::Attr("a[rel='next']", "href"),
            ]),
            anime_slug: nav(&[Strategy::Attr(".naveps .nvsc a", "href")]),
        };

        Ok(Episode {
            title,
            anime_title: resolve(
                root,
                &[
                    Strategy::Text(".episodeinf .infolimit h2"),
                    Strategy::Text(".infox h2"),
                ],
            )
            .map(|t| strip_suffixes(&t, TITLE_SUFFIXES)),
            streaming_servers: Self::servers(root),
            download_links,
            navigation,
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/?s={}", self.base_url, urlencoding::encode(query))
    }

    fn parse_search(&self, body: &str, _query: &str) -> Result<Vec<AnimeSummary>> {
        Ok(self.browse(body, 1).items)
    }

    fn genres_url(&self) -> String {
        format!("{}/daftar-anime-2/", self.base_url)
    }

    fn parse_genres(&self, body: &str) -> Result<Vec<Genre>> {
        let doc = Html::parse_document(body);
        Ok(parse_genre_links(doc.root_element(), "a[href*='/genre/']"))
    }

    fn letter_url(&self, letter: char, page: u32) -> String {
        let letter = if letter == '#' { "0-9".to_string() } else { letter.to_string() };
        format!(
            "{}/daftar-anime-2/page/{}/?title={}&order=title",
            self.base_url,
            page,
            urlencoding::encode(&letter)
        )
    }

    fn parse_letter(&self, body: &str, _letter: char, page: u32) -> Result<ListPage<AnimeSummary>> {
        Ok(self.browse(body, page))
    }
}
