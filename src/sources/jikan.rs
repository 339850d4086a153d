//! Jikan, the public MyAnimeList REST mirror.
//!
//! Slugs are MyAnimeList ids; episode slugs are `<anime id>-<episode>`.
//! There are no streams or downloads, so episodes only carry a title and
//! navigation.

use super::{filter_by_letter, Site};
use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::models::{
    AnimeDetail, AnimeMetadata, AnimeSummary, Episode, EpisodeRef, Genre, ListPage, Navigation,
};
use crate::pagination::{normalize, RawPagination};
use crate::resolver::resolve_json;
use serde_json::Value;

pub const BASE_URL: &str = "https://api.jikan.moe/v4";

/// Episode refs are synthesized from the episode count; the cap keeps a
/// corrupt count from producing an unbounded list.
const MAX_EPISODES: u32 = 5000;

pub struct Jikan {
    base_url: String,
}

impl Jikan {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url_for("jikan", BASE_URL))
    }
}

fn decode(body: &str, operation: &'static str, target: String) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| ScrapeError::Decode {
        operation,
        target,
        message: e.to_string(),
    })
}

/// Split `52991-3` into the anime id and episode number.
pub fn split_episode_slug(slug: &str) -> Option<(&str, u32)> {
    let (id, number) = slug.rsplit_once('-')?;
    let number = number.parse().ok()?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((id, number))
}

fn summary(item: &Value) -> Option<AnimeSummary> {
    let slug = resolve_json(item, &["/mal_id"])?;
    let title = resolve_json(item, &["/title", "/title_english", "/titles/0/title"])?;
    Some(AnimeSummary {
        slug,
        title,
        poster: resolve_json(
            item,
            &[
                "/images/webp/large_image_url",
                "/images/jpg/large_image_url",
                "/images/jpg/image_url",
            ],
        ),
        rating: resolve_json(item, &["/score"]),
        badge: resolve_json(item, &["/type"]),
        url: resolve_json(item, &["/url"]),
    })
}

fn summaries(doc: &Value) -> Vec<AnimeSummary> {
    doc.get("data")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(summary).collect())
        .unwrap_or_default()
}

fn genres_of(items: Option<&Value>) -> Vec<Genre> {
    items
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|g| {
                    Some(Genre {
                        name: resolve_json(g, &["/name"])?,
                        slug: resolve_json(g, &["/mal_id"])?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn list_page(doc: &Value, page: u32) -> ListPage<AnimeSummary> {
    let items = summaries(doc);
    let raw: RawPagination = doc
        .get("pagination")
        .and_then(|p| serde_json::from_value(p.clone()).ok())
        .unwrap_or_default();
    let raw = raw.with_current(page).with_item_count(items.len());
    ListPage {
        items,
        pagination: normalize(&raw),
    }
}

impl Site for Jikan {
    fn name(&self) -> &'static str {
        "jikan"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![("Accept", "application/json".to_string())]
    }

    fn list_url(&self, page: u32) -> String {
        format!("{}/seasons/now?page={}", self.base_url, page)
    }

    fn parse_list(&self, body: &str, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = decode(body, "list", format!("page {}", page))?;
        Ok(list_page(&doc, page))
    }

    fn detail_url(&self, slug: &str) -> String {
        format!("{}/anime/{}/full", self.base_url, urlencoding::encode(slug))
    }

    fn parse_detail(&self, body: &str, slug: &str) -> Result<AnimeDetail> {
        let doc = decode(body, "detail", format!("slug '{}'", slug))?;
        let data = doc.get("data").unwrap_or(&Value::Null);

        let title = resolve_json(data, &["/title", "/title_english"]).ok_or_else(|| {
            ScrapeError::MissingField {
                field: "title",
                slug: slug.to_string(),
            }
        })?;
        let head = AnimeSummary {
            slug: slug.to_string(),
            title,
            ..summary(data).unwrap_or_default()
        };

        let season = match (
            resolve_json(data, &["/season"]),
            resolve_json(data, &["/year"]),
        ) {
            (Some(s), Some(y)) => Some(format!("{} {}", s, y)),
            (s, _) => s,
        };
        let metadata = AnimeMetadata {
            alternative_title: resolve_json(data, &["/title_japanese", "/title_english"]),
            status: resolve_json(data, &["/status"]),
            kind: resolve_json(data, &["/type"]),
            studio: resolve_json(data, &["/studios/0/name"]),
            season,
            duration: resolve_json(data, &["/duration"]),
            release_date: resolve_json(data, &["/aired/string", "/aired/from"]),
            score: resolve_json(data, &["/score"]),
            total_episodes: resolve_json(data, &["/episodes"]),
        };

        let count = data
            .get("episodes")
            .and_then(Value::as_u64)
            .map(|n| n.min(MAX_EPISODES as u64) as u32)
            .unwrap_or(0);
        let episode_lists = (1..=count)
            .map(|n| EpisodeRef {
                episode_number: Some(n.to_string()),
                title: format!("Episode {}", n),
                slug: format!("{}-{}", slug, n),
                release_date: None,
            })
            .collect();

        let mut genres = genres_of(data.get("genres"));
        genres.extend(genres_of(data.get("themes")));

        Ok(AnimeDetail {
            summary: head,
            synopsis: resolve_json(data, &["/synopsis", "/background"]),
            metadata,
            genres,
            episode_lists,
        })
    }

    fn episode_url(&self, slug: &str) -> String {
        match split_episode_slug(slug) {
            Some((id, n)) => format!("{}/anime/{}/episodes/{}", self.base_url, id, n),
            None => format!("{}/anime/{}/episodes", self.base_url, urlencoding::encode(slug)),
        }
    }

    fn parse_episode(&self, body: &str, slug: &str) -> Result<Episode> {
        let (id, number) = split_episode_slug(slug).ok_or_else(|| ScrapeError::InvalidInput {
            operation: "episode",
            message: format!("'{}' is not of the form <anime id>-<episode>", slug),
        })?;
        let doc = decode(body, "episode", format!("episode '{}'", slug))?;
        let data = doc.get("data").unwrap_or(&Value::Null);

        let name = resolve_json(data, &["/title", "/title_romanji", "/title_japanese"])
            .ok_or_else(|| ScrapeError::MissingField {
                field: "title",
                slug: slug.to_string(),
            })?;

        Ok(Episode {
            title: format!("Episode {}: {}", number, name),
            anime_title: None,
            streaming_servers: Vec::new(),
            download_links: Vec::new(),
            navigation: Navigation {
                prev_slug: (number > 1).then(|| format!("{}-{}", id, number - 1)),
                // The episode payload carries no total.
                next_slug: None,
                anime_slug: Some(id.to_string()),
            },
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/anime?q={}&limit=25&sfw=true",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    fn parse_search(&self, body: &str, query: &str) -> Result<Vec<AnimeSummary>> {
        let doc = decode(body, "search", format!("query '{}'", query))?;
        Ok(summaries(&doc))
    }

    fn genres_url(&self) -> String {
        format!("{}/genres/anime", self.base_url)
    }

    fn parse_genres(&self, body: &str) -> Result<Vec<Genre>> {
        let doc = decode(body, "genres", "genre index".to_string())?;
        Ok(genres_of(doc.get("data")))
    }

    fn letter_url(&self, letter: char, page: u32) -> String {
        // The API only indexes letters; '#' falls back to title order.
        if letter == '#' {
            format!("{}/anime?order_by=title&sort=asc&page={}", self.base_url, page)
        } else {
            format!(
                "{}/anime?letter={}&order_by=title&sort=asc&page={}",
                self.base_url, letter, page
            )
        }
    }

    fn parse_letter(&self, body: &str, letter: char, page: u32) -> Result<ListPage<AnimeSummary>> {
        let doc = decode(body, "by_letter", format!("letter '{}' page {}", letter, page))?;
        let listing = list_page(&doc, page);
        if letter == '#' {
            return Ok(filter_by_letter(listing, '#'));
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Jikan {
        Jikan::new("https://jikan.test/v4")
    }

    const SEASON: &str = r#"{
        "pagination": {"last_visible_page": 4, "has_next_page": true, "current_page": 1,
                       "items": {"count": 2, "total": 80, "per_page": 25}},
        "data": [
            {"mal_id": 52991, "url": "https://myanimelist.net/anime/52991/Sousou_no_Frieren",
             "images": {"jpg": {"image_url": "https://cdn.test/s.jpg", "large_image_url": "https://cdn.test/l.jpg"}},
             "title": "Sousou no Frieren", "type": "TV", "score": 9.31, "episodes": 28},
            {"mal_id": 1, "title": ""}
        ]
    }"#;

    #[test]
    fn test_parse_list() {
        let page = site().parse_list(SEASON, 1).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slug, "52991");
        assert_eq!(page.items[0].poster.as_deref(), Some("https://cdn.test/l.jpg"));
        assert_eq!(page.items[0].rating.as_deref(), Some("9.31"));
        assert_eq!(page.pagination.last_page, Some(4));
        assert_eq!(page.pagination.next_page, Some(2));
    }

    #[test]
    fn test_parse_detail_synthesizes_episodes() {
        let body = r#"{"data": {
            "mal_id": 52991, "title": "Sousou no Frieren", "title_japanese": "葬送のフリーレン",
            "type": "TV", "episodes": 3, "status": "Finished Airing", "season": "fall", "year": 2023,
            "aired": {"string": "Sep 29, 2023 to Mar 22, 2024"},
            "studios": [{"mal_id": 11, "name": "Madhouse"}],
            "genres": [{"mal_id": 2, "name": "Adventure"}],
            "themes": [],
            "synopsis": "During their decade-long quest..."
        }}"#;
        let detail = site().parse_detail(body, "52991").unwrap();
        assert_eq!(detail.summary.title, "Sousou no Frieren");
        assert_eq!(detail.metadata.season.as_deref(), Some("fall 2023"));
        assert_eq!(detail.metadata.studio.as_deref(), Some("Madhouse"));
        assert_eq!(detail.genres, vec![Genre { name: "Adventure".into(), slug: "2".into() }]);
        assert_eq!(detail.episode_lists.len(), 3);
        assert_eq!(detail.episode_lists[2].slug, "52991-3");
    }

    #[test]
    fn test_parse_detail_missing_title() {
        let err = site().parse_detail(r#"{"data": {"mal_id": 1}}"#, "ghost-slug").unwrap_err();
        assert!(err.to_string().contains("ghost-slug"));
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = site().parse_list("<html>rate limited</html>", 2).unwrap_err();
        assert!(matches!(err, ScrapeError::Decode { .. }));
        assert!(err.to_string().contains("page 2"));
    }

    #[test]
    fn test_search_decode_error_names_query() {
        let err = site()
            .parse_search("<html>Service Unavailable</html>", "frieren")
            .unwrap_err();
        assert!(err.to_string().contains("query 'frieren'"));
    }

    #[test]
    fn test_parse_episode() {
        let body = r#"{"data": {"mal_id": 3, "title": "Killing Magic", "aired": "2023-10-06"}}"#;
        let episode = site().parse_episode(body, "52991-3").unwrap();
        assert_eq!(episode.title, "Episode 3: Killing Magic");
        assert_eq!(episode.navigation.prev_slug.as_deref(), Some("52991-2"));
        assert_eq!(episode.navigation.anime_slug.as_deref(), Some("52991"));
        assert_eq!(
            site().episode_url("52991-3"),
            "https://jikan.test/v4/anime/52991/episodes/3"
        );
    }

    #[test]
    fn test_split_episode_slug() {
        assert_eq!(split_episode_slug("52991-12"), Some(("52991", 12)));
        assert_eq!(split_episode_slug("frieren-1"), None);
        assert_eq!(split_episode_slug("52991"), None);
    }
}
