use serde::{Deserialize, Serialize};

/// One catalogue entry as it appears in list, search and A-Z pages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AnimeSummary {
    pub slug: String,
    pub title: String,
    pub poster: Option<String>,
    pub rating: Option<String>,
    /// Episode count or type badge shown on the card ("Episode 12", "TV").
    pub badge: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Genre {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AnimeMetadata {
    pub alternative_title: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub studio: Option<String>,
    pub season: Option<String>,
    pub duration: Option<String>,
    pub release_date: Option<String>,
    pub score: Option<String>,
    pub total_episodes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EpisodeRef {
    pub episode_number: Option<String>,
    pub title: String,
    pub slug: String,
    pub release_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnimeDetail {
    #[serde(flatten)]
    pub summary: AnimeSummary,
    pub synopsis: Option<String>,
    pub metadata: AnimeMetadata,
    pub genres: Vec<Genre>,
    pub episode_lists: Vec<EpisodeRef>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VideoSource {
    pub quality: Option<String>,
    pub provider: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StreamingServer {
    pub name: String,
    /// Opaque server token exactly as the source exposes it.
    pub value: String,
    pub selected: bool,
    pub video_sources: Vec<VideoSource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadLink {
    pub provider: String,
    pub url: String,
}

/// Links sharing one quality header, in document order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DownloadGroup {
    /// Display label, e.g. "MKV 720p" or "MP4 480p Softsub".
    pub quality: String,
    pub format: Option<String>,
    pub resolution: Option<String>,
    pub subtitle: Option<String>,
    pub size: Option<String>,
    pub links: Vec<DownloadLink>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Navigation {
    pub prev_slug: Option<String>,
    pub next_slug: Option<String>,
    pub anime_slug: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Episode {
    pub title: String,
    pub anime_title: Option<String>,
    pub streaming_servers: Vec<StreamingServer>,
    pub download_links: Vec<DownloadGroup>,
    pub navigation: Navigation,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PaginationInfo {
    pub current_page: u32,
    pub last_page: Option<u32>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub previous_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl PaginationInfo {
    /// Pagination for a listing that has exactly one page.
    pub fn single_page() -> Self {
        Self {
            current_page: 1,
            last_page: Some(1),
            has_previous_page: false,
            has_next_page: false,
            previous_page: None,
            next_page: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_flattens_summary_fields() {
        let detail = AnimeDetail {
            summary: AnimeSummary {
                slug: "one-piece".to_string(),
                title: "One Piece".to_string(),
                ..Default::default()
            },
            synopsis: None,
            metadata: AnimeMetadata {
                kind: Some("TV".to_string()),
                ..Default::default()
            },
            genres: vec![],
            episode_lists: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["slug"], "one-piece");
        assert_eq!(json["title"], "One Piece");
        assert_eq!(json["metadata"]["type"], "TV");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn test_single_page_pagination() {
        let p = PaginationInfo::single_page();
        assert_eq!(p.current_page, 1);
        assert_eq!(p.last_page, Some(1));
        assert!(!p.has_next_page && !p.has_previous_page);
    }
}
