//! Engine-facing media descriptors.
//!
//! The coordinator never hands a [`PlayableItem`] to the engine; it converts it
//! into a [`MediaDescriptor`] first. The conversion is where transport URLs are
//! validated, so an item without a usable URL is rejected before any engine
//! call.

use chrono::Local;
use serde::Serialize;
use url::Url;

use crate::errors::PlayerError;
use crate::item::PlayableItem;
use crate::time_utils::format_publish_date;

pub const MIME_HLS: &str = "application/x-mpegURL";
pub const MIME_AAC: &str = "audio/aac";
pub const MIME_MPEG: &str = "audio/mpeg";

/// How the engine should fetch the media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Delivery {
    /// Adaptive-bitrate playlist
    Adaptive,
    /// Single progressive HTTP resource
    Progressive,
}

/// Lock screen / notification metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: Option<String>,
    pub album_title: Option<String>,
    pub artwork_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaDescriptor {
    pub media_id: String,
    pub uri: Url,
    pub delivery: Delivery,
    pub mime_type: &'static str,
    pub metadata: MediaMetadata,
    pub is_live: bool,
}

/// Returns the URL if it is an absolute http(s) URL with a host.
pub fn usable_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Some(url),
        _ => None,
    }
}

impl MediaDescriptor {
    /// Builds the descriptor for an item.
    ///
    /// Streams prefer the adaptive source, then progressive AAC, then MP3.
    /// Episodes always use their progressive enclosure.
    pub fn from_item(item: &PlayableItem) -> Result<Self, PlayerError> {
        match item {
            PlayableItem::Stream {
                id,
                name,
                artwork,
                sources,
                live,
            } => {
                let candidates = [
                    (sources.hls.as_deref(), Delivery::Adaptive, MIME_HLS),
                    (sources.aac.as_deref(), Delivery::Progressive, MIME_AAC),
                    (sources.mp3.as_deref(), Delivery::Progressive, MIME_MPEG),
                ];
                let (uri, delivery, mime_type) = candidates
                    .into_iter()
                    .find_map(|(raw, delivery, mime)| {
                        raw.and_then(usable_url).map(|url| (url, delivery, mime))
                    })
                    .ok_or_else(|| {
                        PlayerError::InvalidSource(format!("station {} ({})", id, name))
                    })?;

                let live = live.clone().unwrap_or_default();
                Ok(Self {
                    media_id: item.identity().to_string(),
                    uri,
                    delivery,
                    mime_type,
                    metadata: MediaMetadata {
                        title: live.title.unwrap_or_else(|| name.clone()),
                        artist: live.artist.or_else(|| Some(name.clone())),
                        album_title: live.album,
                        artwork_uri: artwork.clone(),
                    },
                    is_live: true,
                })
            }
            PlayableItem::Episode {
                id,
                podcast_name,
                title,
                artwork,
                enclosure_url,
                published_at,
                ..
            } => {
                let uri = usable_url(enclosure_url).ok_or_else(|| {
                    PlayerError::InvalidSource(format!("episode {} ({})", id, title))
                })?;

                Ok(Self {
                    media_id: item.identity().to_string(),
                    uri,
                    delivery: Delivery::Progressive,
                    mime_type: MIME_MPEG,
                    metadata: MediaMetadata {
                        title: title.clone(),
                        artist: Some(podcast_name.clone()),
                        album_title: published_at
                            .as_ref()
                            .map(|at| format_publish_date(at, &Local)),
                        artwork_uri: artwork.clone(),
                    },
                    is_live: false,
                })
            }
        }
    }
}
