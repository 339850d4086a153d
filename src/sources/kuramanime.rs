//! Kuramanime: Bootstrap theme with numeric-id slugs (`2310/one-piece`).
//!
//! The detail page keeps its episode list in the `data-content` popover
//! payload of `#episodeLists`, filled in by script, so detail fetches are
//! rendered.

use super::{
    filter_by_letter, parse_cards, parse_genre_links, path_after, CardLayout, Operation, Site,
};
use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::grouping::{flatten, group};
use crate::helpers::{absolute_url, episode_number};
use crate::models::{
    AnimeDetail, AnimeMetadata, AnimeSummary, Episode, EpisodeRef, Genre, ListPage, Navigation,
    StreamingServer, VideoSource,
};
use crate::pagination::{normalize, scan_links, LinkLayout};
use crate::resolver::{labeled_value, resolve, select_all, select_first, text_of, Strategy};
use crate::streaming::split_quality;
use scraper::{ElementRef, Html};

pub const BASE_URL: &str = "https://kuramanime.dad";

fn anime_slug(url: &str) -> Option<String> {
    path_after(url, "/anime/")
}

const CARDS: CardLayout = CardLayout {
    containers: &["#animeList .product__item", ".product__page__content .product__item", ".product__item"],
    slug_of: anime_slug,
    link: &[Strategy::Attr(".product__item__text h5 a", "href"), Strategy::Attr("a", "href")],
    title: &[Strategy::Text(".product__item__text h5 a"), Strategy::Text("h5")],
    poster: &[
        Strategy::Attr(".product__item__pic", "data-setbg"),
        Strategy::Attr("img", "src"),
    ],
    rating: &[Strategy::Text(".product__item__pic .view-end")],
    badge: &[Strategy::Text(".product__item__pic .ep")],
};

const PAGE_LINKS: LinkLayout = LinkLayout {
    links: ".product__pagination a.page__link",
    current: ".product__pagination a.current-page",
    next: "#nextPage",
    prev: "#prevPage",
};

const INFO: &str = ".anime__details__widget ul li";

pub struct Kuramanime {
    base_url: String,
}

impl Kuramanime {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url_for("kuramanime", BASE_URL))
    }

    fn listing(&self, root: ElementRef, page: u32) -> ListPage<AnimeSummary> {
        let items = parse_cards(root, &CARDS, &self.base_url);
        let raw = scan_links(root, &PAGE_LINKS)
            .with_current(page)
            .with_item_count(items.len());
        ListPage {
            items,
            pagination: normalize(&raw),
        }
    }

    /// Episode links from the popover payload, falling back to links
    /// already rendered into the page.
    fn episodes(&self, root: ElementRef) -> Vec<EpisodeRef> {
        let payload = select_first(root, "#episodeLists")
            .and_then(|el| el.value().attr("data-content"))
            .map(Html::parse_fragment);
        let collect = |scope: ElementRef| -> Vec<EpisodeRef> {
            select_all(scope, "a[href*='/episode/']")
                .into_iter()
                .filter_map(|a| {
                    let href = absolute_url(&self.base_url, a.value().attr("href")?);
                    let slug = anime_slug(&href)?;
                    let title = text_of(a);
                    Some(EpisodeRef {
                        episode_number: episode_number(&title)
                            .or_else(|| slug.rsplit('/').next().map(str::to_string)),
                        title,
                        slug,
                        release_date: None,
                    })
                })
                .collect()
        };
        match payload {
            Some(fragment) => collect(fragment.root_element()),
            None => select_first(root, "#episodeListsSection, .episode__list")
                .map(collect)
                .unwrap_or_default(),
        }
    }

    fn servers(&self, root: ElementRef) -> Vec<StreamingServer> {
        let playing: Vec<VideoSource> = select_all(root, "#player source, video source")
            .into_iter()
            .filter_map(|s| {
                let src = s.value().attr("src")?.trim();
                (!src.is_empty()).then(|| VideoSource {
                    quality: s.value().attr("size").map(|q| format!("{}p", q)),
                    provider: "kuramadrive".to_string(),
                    url: absolute_url(&self.base_url, src),
                })
            })
            .collect();

        select_all(root, "#changeServer option")
            .into_iter()
            .filter_map(|opt| {
                let value = opt.value().attr("value")?.trim().to_string();
                let (name, _) = split_quality(&text_of(opt));
                if value.is_empty() || name.is_empty() {
                    return None;
                }
                let selected = opt.value().attr("selected").is_some();
                Some(StreamingServer {
                    name,
                    value,
                    selected,
                    video_sources: if selected { playing.clone() } else { Vec::new() },
                })
            })
            .collect()
    }
}

impl Site for Kuramanime {
    fn name(&self) -> &'static str {
        "kuramanime"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rendered_dom(&self, op: Operation) -> Option<&'static str> {
        match op {
            Operation::Detail => Some("#episodeLists"),
            _ => None,
        }
    }

    fn list_url(&self, page: u32) -> String {
        format!("{}/quick/ongoing?order_by=updated&page={}", self.base_url, page)
    }

    fn parse_list(&self, body: &str, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = Html::parse_document(body);
        Ok(self.listing(doc.root_element(), page))
    }

    fn detail_url(&self, slug: &str) -> String {
        format!("{}/anime/{}", self.base_url, slug)
    }

    fn parse_detail(&self, body: &str, slug: &str) -> Result<AnimeDetail> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let title = resolve(
            root,
            &[
                Strategy::Text(".anime__details__title h3"),
                Strategy::Text(".anime__details__title h1"),
            ],
        )
        .ok_or_else(|| ScrapeError::MissingField {
            field: "title",
            slug: slug.to_string(),
        })?;

        let info = |labels: &[&str]| labeled_value(root, INFO, labels);
        let metadata = AnimeMetadata {
            alternative_title: resolve(root, &[Strategy::Text(".anime__details__title span")]),
            status: info(&["status"]),
            kind: info(&["tipe", "type"]),
            studio: info(&["studio"]),
            season: info(&["musim", "season"]),
            duration: info(&["durasi", "duration"]),
            release_date: info(&["tayang", "aired"]),
            score: info(&["skor", "score"]),
            total_episodes: info(&["ketersediaan", "episode", "total episode"]),
        };

        Ok(AnimeDetail {
            summary: AnimeSummary {
                slug: slug.to_string(),
                title,
                poster: resolve(
                    root,
                    &[
                        Strategy::Attr(".anime__details__pic", "data-setbg"),
                        Strategy::Attr(".anime__details__pic img", "src"),
                    ],
                )
                .map(|p| absolute_url(&self.base_url, &p)),
                rating: metadata.score.clone(),
                badge: metadata.kind.clone(),
                url: Some(self.detail_url(slug)),
            },
            synopsis: resolve(
                root,
                &[Strategy::Text("#synopsisField"), Strategy::Text(".anime__details__text p")],
            ),
            metadata,
            genres: parse_genre_links(root, ".anime__details__widget a[href*='/genre/']"),
            episode_lists: self.episodes(root),
        })
    }

    fn episode_url(&self, slug: &str) -> String {
        format!("{}/anime/{}", self.base_url, slug)
    }

    fn parse_episode(&self, body: &str, slug: &str) -> Result<Episode> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();

        let anime_title = resolve(
            root,
            &[
                Strategy::Text(".breadcrumb__links h6"),
                Strategy::Text(".anime__details__title h3"),
            ],
        );
        let title = resolve(
            root,
            &[
                Strategy::Text("#episodeTitle"),
                Strategy::Text(".breadcrumb__links__v2 span:last-child"),
            ],
        )
        .map(|ep| match &anime_title {
            Some(anime) if !ep.contains(anime.as_str()) => format!("{} {}", anime, ep),
            _ => ep,
        })
        .ok_or_else(|| ScrapeError::MissingField {
            field: "title",
            slug: slug.to_string(),
        })?;

        let download_links = select_first(root, "#animeDownloadLink")
            .map(|section| group(&flatten(section)))
            .unwrap_or_default();

        let nav = |strategies: &[Strategy]| {
            resolve(root, strategies).and_then(|h| anime_slug(&absolute_url(&self.base_url, &h)))
        };
        let series = nav(&[Strategy::Attr(".breadcrumb__links a[href*='/anime/']", "href")])
            .map(|s| s.split("/episode/").next().unwrap_or_default().to_string());
        let navigation = Navigation {
            prev_slug: nav(&[Strategy::Attr("#animeEpisodePrev, a.ep-prev", "href")]),
            next_slug: nav(&[Strategy::Attr("#animeEpisodeNext, a.ep-next", "href")]),
            anime_slug: series,
        };

        Ok(Episode {
            title,
            anime_title,
            streaming_servers: self.servers(root),
            download_links,
            navigation,
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/anime?search={}&order_by=latest",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    fn parse_search(&self, body: &str, _query: &str) -> Result<Vec<AnimeSummary>> {
        let doc = Html::parse_document(body);
        Ok(parse_cards(doc.root_element(), &CARDS, &self.base_url))
    }

    fn genres_url(&self) -> String {
        format!("{}/properties/genre", self.base_url)
    }

    fn parse_genres(&self, body: &str) -> Result<Vec<Genre>> {
        let doc = Html::parse_document(body);
        let root = doc.root_element();
        let genres = parse_genre_links(root, ".kuramanime__genres ul li a");
        if genres.is_empty() {
            return Ok(parse_genre_links(root, "a[href*='/properties/genre/']"));
        }
        Ok(genres)
    }

    fn letter_url(&self, letter: char, page: u32) -> String {
        // No A-Z index: narrow through search, sorted by title. Digits and
        // symbols sort first in the plain title order.
        if letter == '#' {
            format!("{}/anime?order_by=text&page={}", self.base_url, page)
        } else {
            format!(
                "{}/anime?search={}&order_by=text&page={}",
                self.base_url, letter, page
            )
        }
    }

    /// Search matches the letter anywhere in the title; only titles that
    /// start with it are kept.
    fn parse_letter(&self, body: &str, letter: char, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = Html::parse_document(body);
        Ok(filter_by_letter(self.listing(doc.root_element(), page), letter))
    }
}
