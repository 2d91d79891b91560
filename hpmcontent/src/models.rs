//! Data models for the HPM content service
//!
//! This module contains the structures needed to deserialize the JSON
//! documents published by the content service: live stations, now-playing
//! metadata, podcasts and their episode feeds, priority articles, promos and
//! category posts.
//!
//! Fields the service may omit are `#[serde(default)]` so that a partial
//! document still deserializes; empty strings are normalized to `None` by the
//! accessor methods rather than stored as placeholders.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artist prefix used by the house stations for their own programming
pub const HOUSE_ARTIST: &str = "Houston Public Media";

/// WordPress `*_gmt` timestamp format (no zone designator)
pub const WP_GMT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parses a WordPress GMT timestamp (`2024-05-01T12:00:00`) as UTC
pub fn parse_gmt_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, WP_GMT_FORMAT) {
        return Some(naive.and_utc());
    }
    // Certains flux renvoient un horodatage RFC 3339 complet
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// ============================================================================
// Envelope
// ============================================================================

/// Standard `{code, message, data}` envelope used by the WordPress endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

// ============================================================================
// Live Streams
// ============================================================================

/// Document served at `assets/streams.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Streams {
    #[serde(default)]
    pub audio: Vec<Station>,
}

/// A live radio station and its transport URLs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: i64,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub artwork: String,
    #[serde(default)]
    pub aac_source: String,
    #[serde(default)]
    pub hls_source: String,
    #[serde(default)]
    pub mp3_source: String,
}

impl Station {
    /// Artwork URL, if any
    pub fn artwork(&self) -> Option<&str> {
        non_empty(&self.artwork)
    }

    /// Adaptive-bitrate (HLS) playlist URL, if any
    pub fn hls_source(&self) -> Option<&str> {
        non_empty(&self.hls_source)
    }

    /// Progressive AAC stream URL, if any
    pub fn aac_source(&self) -> Option<&str> {
        non_empty(&self.aac_source)
    }

    /// Progressive MP3 stream URL, if any
    pub fn mp3_source(&self) -> Option<&str> {
        non_empty(&self.mp3_source)
    }
}

// ============================================================================
// Now Playing
// ============================================================================

/// Document served at `assets/nowplay/all.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NowPlaying {
    #[serde(default)]
    pub radio: Vec<NowPlayingStation>,
    #[serde(default)]
    pub tv: Vec<NowPlayingStation>,
}

impl NowPlaying {
    /// Now-playing entry for a radio station id
    pub fn radio_station(&self, id: i64) -> Option<&NowPlayingStation> {
        self.radio.iter().find(|s| s.id == id)
    }
}

/// What a station is currently airing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NowPlayingStation {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: String,
}

impl NowPlayingStation {
    /// One-line label for the current program
    ///
    /// House programming (artist containing "Houston Public Media") shows the
    /// title alone, everything else reads `artist - title`.
    ///
    /// ```
    /// use hpmcontent::NowPlayingStation;
    ///
    /// let np = NowPlayingStation {
    ///     id: 1,
    ///     artist: "Yo-Yo Ma".into(),
    ///     title: "Cello Suite No. 1".into(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(np.display_line(), "Yo-Yo Ma - Cello Suite No. 1");
    /// ```
    pub fn display_line(&self) -> String {
        match (non_empty(&self.artist), non_empty(&self.title)) {
            (Some(artist), _) if artist.contains(HOUSE_ARTIST) => self.title.trim().to_string(),
            (Some(artist), Some(title)) => format!("{} - {}", artist, title),
            (Some(artist), None) => artist.to_string(),
            (None, Some(title)) => title.to_string(),
            (None, None) => String::new(),
        }
    }

    pub fn artist(&self) -> Option<&str> {
        non_empty(&self.artist)
    }

    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    pub fn album(&self) -> Option<&str> {
        non_empty(&self.album)
    }
}

// ============================================================================
// Podcasts
// ============================================================================

/// `data` payload of the podcast list endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PodcastList {
    #[serde(default)]
    pub list: Vec<Podcast>,
}

/// A podcast show
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Podcast {
    pub id: i64,
    #[serde(default)]
    pub image: PodcastImageCrops,
    #[serde(default)]
    pub feed: String,
    #[serde(default)]
    pub archive: String,
    #[serde(default)]
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub feed_json: String,
    #[serde(default)]
    pub external_links: PodcastExternalLinks,
}

impl Podcast {
    /// Best artwork available, medium crop first
    pub fn artwork(&self) -> Option<&str> {
        non_empty(&self.image.medium.url)
            .or_else(|| non_empty(&self.image.full.url))
            .or_else(|| non_empty(&self.image.thumbnail.url))
    }

    /// URL of the JSON episode feed, if published
    pub fn feed_json(&self) -> Option<&str> {
        non_empty(&self.feed_json)
    }
}

/// Image renditions of a podcast cover
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodcastImageCrops {
    #[serde(default)]
    pub full: ImageCrop,
    #[serde(default)]
    pub medium: ImageCrop,
    #[serde(default)]
    pub thumbnail: ImageCrop,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageCrop {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Links to the show on third-party directories
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PodcastExternalLinks {
    pub itunes: Option<String>,
    pub npr: Option<String>,
    pub youtube: Option<String>,
    pub spotify: Option<String>,
    pub pcast: Option<String>,
    pub overcast: Option<String>,
    pub amazon: Option<String>,
    pub tunein: Option<String>,
    pub pandora: Option<String>,
    pub iheart: Option<String>,
}

/// `data` payload of a podcast JSON feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PodcastFeedDetail {
    #[serde(default)]
    pub feed: PodcastFeedItems,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PodcastFeedItems {
    #[serde(default)]
    pub items: Vec<PodcastEpisode>,
}

/// One episode of a podcast feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodcastEpisode {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub content_html: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub date_gmt: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub episode: String,
    #[serde(default, rename = "episodeType")]
    pub episode_type: String,
    #[serde(default)]
    pub attachments: PodcastEnclosure,
}

impl PodcastEpisode {
    /// Publication instant, from `date_gmt`
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_gmt_timestamp(&self.date_gmt)
    }

    pub fn thumbnail(&self) -> Option<&str> {
        non_empty(&self.thumbnail)
    }
}

/// Audio enclosure of an episode
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodcastEnclosure {
    #[serde(default)]
    pub url: String,
    /// Seconds, `MM:SS` or `HH:MM:SS` depending on the feed
    #[serde(default, deserialize_with = "string_or_number")]
    pub duration_in_seconds: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a duration string or number, got {}",
            other
        ))),
    }
}

// ============================================================================
// Priority data (home screen)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriorityArticleData {
    #[serde(default)]
    pub articles: Vec<PriorityArticle>,
    #[serde(default)]
    pub breaking: Option<BreakingNews>,
    #[serde(default)]
    pub talkshow: String,
    #[serde(default)]
    pub weather: Option<HpmWeather>,
}

impl PriorityArticleData {
    /// Distinct primary categories of the priority articles, in order
    pub fn category_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for article in &self.articles {
            if let Some(category) = &article.primary_category {
                if !ids.contains(&category.id) {
                    ids.push(category.id);
                }
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreakingNews {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityArticle {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub date_gmt: String,
    #[serde(default)]
    pub primary_category: Option<WpCategory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HpmWeather {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub temperature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WpCategory {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

// ============================================================================
// Promos and category posts
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromoData {
    #[serde(default)]
    pub promos: Vec<Promo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Promo {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub content: String,
}

/// A WordPress post from `wp/v2/posts`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleData {
    pub id: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub date_gmt: String,
    #[serde(default)]
    pub modified_gmt: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default)]
    pub featured_media_url: String,
}

impl ArticleData {
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_gmt_timestamp(&self.date_gmt)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}
