//! Playable items and the current selection.
//!
//! A [`PlayableItem`] is either a live [`PlayableItem::Stream`] or an
//! on-demand [`PlayableItem::Episode`]. Items are built from content service
//! models and carry only what the player needs; missing values are `None`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hpmcontent::{NowPlayingStation, Podcast, PodcastEpisode, Station};
use serde::Serialize;
use tracing::debug;

use crate::time_utils::parse_duration;

/// Live or on-demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioKind {
    Stream,
    Episode,
}

impl fmt::Display for AudioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioKind::Stream => write!(f, "stream"),
            AudioKind::Episode => write!(f, "episode"),
        }
    }
}

/// Identity used to decide resume vs reload: same kind and same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ItemIdentity {
    pub kind: AudioKind,
    pub id: i64,
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Transport URLs of a live station.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSources {
    /// Adaptive-bitrate playlist (HLS)
    pub hls: Option<String>,
    /// Progressive AAC
    pub aac: Option<String>,
    /// Progressive MP3
    pub mp3: Option<String>,
}

impl StreamSources {
    pub fn is_empty(&self) -> bool {
        self.hls.is_none() && self.aac.is_none() && self.mp3.is_none()
    }
}

/// Program airing on a station when it was selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

impl LiveMetadata {
    pub fn from_now_playing(np: &NowPlayingStation) -> Self {
        Self {
            artist: np.artist().map(str::to_string),
            title: np.title().map(str::to_string),
            album: np.album().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlayableItem {
    Stream {
        id: i64,
        name: String,
        artwork: Option<String>,
        sources: StreamSources,
        live: Option<LiveMetadata>,
    },
    Episode {
        id: i64,
        podcast_name: String,
        title: String,
        artwork: Option<String>,
        enclosure_url: String,
        published_at: Option<DateTime<Utc>>,
        duration: Option<Duration>,
    },
}

impl PlayableItem {
    /// Builds a stream item from a station and, optionally, what it is airing.
    pub fn from_station(station: &Station, now_playing: Option<&NowPlayingStation>) -> Self {
        PlayableItem::Stream {
            id: station.id,
            name: station.name.clone(),
            artwork: station.artwork().map(str::to_string),
            sources: StreamSources {
                hls: station.hls_source().map(str::to_string),
                aac: station.aac_source().map(str::to_string),
                mp3: station.mp3_source().map(str::to_string),
            },
            live: now_playing.map(LiveMetadata::from_now_playing),
        }
    }

    /// Builds an episode item. The episode thumbnail wins over the show artwork.
    pub fn from_episode(podcast: &Podcast, episode: &PodcastEpisode) -> Self {
        let raw_duration = episode.attachments.duration_in_seconds.trim();
        let duration = if raw_duration.is_empty() {
            None
        } else {
            match parse_duration(raw_duration) {
                Ok(d) => Some(d),
                Err(e) => {
                    debug!(episode = episode.id, "Ignoring episode duration: {}", e);
                    None
                }
            }
        };

        PlayableItem::Episode {
            id: episode.id,
            podcast_name: podcast.name.clone(),
            title: episode.title.clone(),
            artwork: episode
                .thumbnail()
                .or_else(|| podcast.artwork())
                .map(str::to_string),
            enclosure_url: episode.attachments.url.trim().to_string(),
            published_at: episode.published_at(),
            duration,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            PlayableItem::Stream { id, .. } | PlayableItem::Episode { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> AudioKind {
        match self {
            PlayableItem::Stream { .. } => AudioKind::Stream,
            PlayableItem::Episode { .. } => AudioKind::Episode,
        }
    }

    pub fn identity(&self) -> ItemIdentity {
        ItemIdentity {
            kind: self.kind(),
            id: self.id(),
        }
    }

    /// True iff this is a live stream.
    pub fn is_live(&self) -> bool {
        self.kind() == AudioKind::Stream
    }

    /// Main label: station name or episode title.
    pub fn display_name(&self) -> &str {
        match self {
            PlayableItem::Stream { name, .. } => name,
            PlayableItem::Episode { title, .. } => title,
        }
    }

    /// Secondary label: current program for a stream, show name for an episode.
    pub fn subtitle(&self) -> Option<String> {
        match self {
            PlayableItem::Stream { live, .. } => live.as_ref().and_then(|m| {
                match (m.artist.as_deref(), m.title.as_deref()) {
                    (Some(a), Some(t)) => Some(format!("{} - {}", a, t)),
                    (Some(a), None) => Some(a.to_string()),
                    (None, Some(t)) => Some(t.to_string()),
                    (None, None) => None,
                }
            }),
            PlayableItem::Episode { podcast_name, .. } => Some(podcast_name.clone()),
        }
    }

    pub fn artwork(&self) -> Option<&str> {
        match self {
            PlayableItem::Stream { artwork, .. } | PlayableItem::Episode { artwork, .. } => {
                artwork.as_deref()
            }
        }
    }

    /// Duration advertised by the feed, episodes only.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            PlayableItem::Stream { .. } => None,
            PlayableItem::Episode { duration, .. } => *duration,
        }
    }
}

/// What the coordinator last loaded.
///
/// Replaced wholesale on every load, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSelection {
    pub item: PlayableItem,
    /// Row to highlight in the UI (station id or episode id)
    pub origin_index: i64,
}

impl PlaybackSelection {
    pub fn new(item: PlayableItem, origin_index: i64) -> Self {
        Self { item, origin_index }
    }

    pub fn audio_kind(&self) -> AudioKind {
        self.item.kind()
    }

    pub fn identity(&self) -> ItemIdentity {
        self.item.identity()
    }
}
