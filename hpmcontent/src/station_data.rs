//! Last-good content repository
//!
//! `StationData` keeps the most recent successful answer of every content
//! document. A refresh that fails (network, status, JSON) is logged and the
//! previous data is kept, so readers always see something displayable. The
//! repository starts with the three house stations built in, which lets the
//! player work before the first refresh completes.

use crate::client::ContentClient;
use crate::models::{
    ArticleData, NowPlaying, NowPlayingStation, Podcast, PodcastEpisode, PodcastList,
    PriorityArticleData, PromoData, Station, Streams,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Result of one refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New data replaced the previous value
    Updated,
    /// The fetch failed; the previous value is still served
    KeptStale,
}

/// Content documents held by the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentSection {
    Streams,
    NowPlaying,
    Podcasts,
    Episodes(i64),
    Priority,
    Promos,
    Categories,
}

impl fmt::Display for ContentSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSection::Streams => write!(f, "streams"),
            ContentSection::NowPlaying => write!(f, "now-playing"),
            ContentSection::Podcasts => write!(f, "podcasts"),
            ContentSection::Episodes(id) => write!(f, "episodes[{}]", id),
            ContentSection::Priority => write!(f, "priority"),
            ContentSection::Promos => write!(f, "promos"),
            ContentSection::Categories => write!(f, "categories"),
        }
    }
}

/// Built-in house stations, served until the first successful refresh
pub fn default_streams() -> Streams {
    let station = |id: i64, name: &str, image: &str, slug: &str, hls: &str| Station {
        id,
        name: name.to_string(),
        kind: "audio".to_string(),
        artwork: format!(
            "https://cdn.houstonpublicmedia.org/assets/images/ListenLive_{}.png.webp",
            image
        ),
        aac_source: format!("https://stream.houstonpublicmedia.org/{}-aac", slug),
        hls_source: format!("https://hls.houstonpublicmedia.org/{}/playlist.m3u8", hls),
        mp3_source: format!("https://stream.houstonpublicmedia.org/{}-mp3", slug),
    };

    Streams {
        audio: vec![
            station(0, "News 88.7", "News", "news", "hpmnews"),
            station(1, "Classical", "Classical", "classical", "classical"),
            station(2, "The Vibe", "TheVibe", "thevibe", "thevibe"),
        ],
    }
}

/// Now-playing placeholders matching [`default_streams`]
pub fn default_now_playing() -> NowPlaying {
    let entry = |id: i64, name: &str, artist: &str| NowPlayingStation {
        id,
        name: name.to_string(),
        artist: artist.to_string(),
        ..Default::default()
    };

    NowPlaying {
        radio: vec![
            entry(0, "News 88.7", "Houston Public Media News"),
            entry(1, "Classical", "Houston Public Media Classical"),
            entry(2, "The Vibe from KTSU and HPM", "The Vibe from KTSU and HPM"),
        ],
        tv: Vec::new(),
    }
}

#[derive(Debug)]
struct ContentState {
    streams: Streams,
    podcasts: PodcastList,
    episodes: HashMap<i64, Vec<PodcastEpisode>>,
    priority: PriorityArticleData,
    promos: PromoData,
    articles: BTreeMap<i64, ArticleData>,
}

impl Default for ContentState {
    fn default() -> Self {
        Self {
            streams: default_streams(),
            podcasts: PodcastList::default(),
            episodes: HashMap::new(),
            priority: PriorityArticleData::default(),
            promos: PromoData::default(),
            articles: BTreeMap::new(),
        }
    }
}

/// Stale-tolerant store of content service documents
///
/// Shared as `Arc<StationData>`; reads take a short lock and return owned
/// copies. Now-playing metadata is additionally published through a
/// `tokio::sync::watch` channel so displays can follow it without polling.
///
/// ```rust
/// use std::time::Duration;
/// use hpmcontent::{ContentClient, RefreshOutcome, StationData};
///
/// # tokio_test::block_on(async {
/// // Nothing listens on this port: the refresh fails and the house stations stay
/// let client = ContentClient::builder()
///     .base_url("http://127.0.0.1:9")
///     .timeout(Duration::from_millis(200))
///     .build()
///     .unwrap();
/// let data = StationData::new(client);
///
/// assert_eq!(data.refresh_streams().await, RefreshOutcome::KeptStale);
/// assert_eq!(data.streams().len(), 3);
/// # });
/// ```
#[derive(Debug)]
pub struct StationData {
    client: ContentClient,
    state: RwLock<ContentState>,
    now_playing: watch::Sender<Arc<NowPlaying>>,
}

impl StationData {
    pub fn new(client: ContentClient) -> Self {
        let (now_playing, _) = watch::channel(Arc::new(default_now_playing()));
        Self {
            client,
            state: RwLock::new(ContentState::default()),
            now_playing,
        }
    }

    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    fn read(&self) -> RwLockReadGuard<'_, ContentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn kept_stale(section: ContentSection, err: &dyn fmt::Display) -> RefreshOutcome {
        warn!(section = %section, "Content refresh failed, keeping last good data: {}", err);
        RefreshOutcome::KeptStale
    }

    // ========================================================================
    // Readers
    // ========================================================================

    pub fn streams(&self) -> Vec<Station> {
        self.read().streams.audio.clone()
    }

    pub fn station(&self, id: i64) -> Option<Station> {
        self.read().streams.audio.iter().find(|s| s.id == id).cloned()
    }

    pub fn podcasts(&self) -> Vec<Podcast> {
        self.read().podcasts.list.clone()
    }

    pub fn podcast(&self, id: i64) -> Option<Podcast> {
        self.read().podcasts.list.iter().find(|p| p.id == id).cloned()
    }

    /// Episodes already fetched for a podcast
    pub fn episodes(&self, podcast_id: i64) -> Option<Vec<PodcastEpisode>> {
        self.read().episodes.get(&podcast_id).cloned()
    }

    pub fn priority_data(&self) -> PriorityArticleData {
        self.read().priority.clone()
    }

    pub fn promos(&self) -> PromoData {
        self.read().promos.clone()
    }

    /// Category posts collected so far, keyed by article id
    pub fn articles(&self) -> BTreeMap<i64, ArticleData> {
        self.read().articles.clone()
    }

    pub fn now_playing(&self) -> Arc<NowPlaying> {
        self.now_playing.borrow().clone()
    }

    /// Now-playing entry of a radio station
    pub fn now_playing_for(&self, station_id: i64) -> Option<NowPlayingStation> {
        self.now_playing.borrow().radio_station(station_id).cloned()
    }

    /// Follow now-playing updates
    pub fn subscribe_now_playing(&self) -> watch::Receiver<Arc<NowPlaying>> {
        self.now_playing.subscribe()
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    pub async fn refresh_streams(&self) -> RefreshOutcome {
        match self.client.streams().await {
            Ok(streams) if streams.audio.is_empty() => {
                Self::kept_stale(ContentSection::Streams, &"empty station list")
            }
            Ok(streams) => {
                debug!(count = streams.audio.len(), "Stations refreshed");
                self.write().streams = streams;
                RefreshOutcome::Updated
            }
            Err(e) => Self::kept_stale(ContentSection::Streams, &e),
        }
    }

    pub async fn refresh_now_playing(&self) -> RefreshOutcome {
        match self.client.now_playing().await {
            Ok(now) => {
                let now = Arc::new(now);
                self.now_playing.send_if_modified(|current| {
                    if **current == *now {
                        false
                    } else {
                        *current = now.clone();
                        true
                    }
                });
                RefreshOutcome::Updated
            }
            Err(e) => Self::kept_stale(ContentSection::NowPlaying, &e),
        }
    }

    pub async fn refresh_podcasts(&self) -> RefreshOutcome {
        match self.client.podcasts().await {
            Ok(list) => {
                debug!(count = list.list.len(), "Podcasts refreshed");
                self.write().podcasts = list;
                RefreshOutcome::Updated
            }
            Err(e) => Self::kept_stale(ContentSection::Podcasts, &e),
        }
    }

    /// Fetch the episode feed of one podcast
    pub async fn refresh_episodes(&self, podcast_id: i64) -> RefreshOutcome {
        let section = ContentSection::Episodes(podcast_id);
        let Some(podcast) = self.podcast(podcast_id) else {
            return Self::kept_stale(section, &crate::Error::PodcastNotFound(podcast_id));
        };

        match self.client.podcast_episodes(&podcast).await {
            Ok(detail) => {
                debug!(podcast = %podcast.name, count = detail.feed.items.len(), "Episodes refreshed");
                self.write().episodes.insert(podcast_id, detail.feed.items);
                RefreshOutcome::Updated
            }
            Err(e) => Self::kept_stale(section, &e),
        }
    }

    pub async fn refresh_priority_data(&self) -> RefreshOutcome {
        match self.client.priority_data().await {
            Ok(data) => {
                self.write().priority = data;
                RefreshOutcome::Updated
            }
            Err(e) => Self::kept_stale(ContentSection::Priority, &e),
        }
    }

    pub async fn refresh_promos(&self) -> RefreshOutcome {
        match self.client.promos().await {
            Ok(promos) => {
                self.write().promos = promos;
                RefreshOutcome::Updated
            }
            Err(e) => Self::kept_stale(ContentSection::Promos, &e),
        }
    }

    /// Fetch the latest posts of each category
    ///
    /// An empty `categories` slice falls back to the primary categories of
    /// the priority articles. Posts are merged by article id; the refresh
    /// counts as updated when at least one category answered.
    pub async fn refresh_categories(&self, categories: &[i64], per_page: u32) -> RefreshOutcome {
        let ids = if categories.is_empty() {
            self.read().priority.category_ids()
        } else {
            categories.to_vec()
        };

        let mut any_updated = false;
        for id in ids {
            match self.client.category_articles(id, per_page).await {
                Ok(articles) => {
                    let mut state = self.write();
                    for article in articles {
                        state.articles.insert(article.id, article);
                    }
                    any_updated = true;
                }
                Err(e) => {
                    warn!(category = id, "Category refresh failed: {}", e);
                }
            }
        }

        if any_updated {
            RefreshOutcome::Updated
        } else {
            RefreshOutcome::KeptStale
        }
    }

    /// Refresh every document once, in home screen order
    pub async fn refresh_all(
        &self,
        categories: &[i64],
        per_page: u32,
    ) -> Vec<(ContentSection, RefreshOutcome)> {
        let report = vec![
            (ContentSection::Priority, self.refresh_priority_data().await),
            (ContentSection::Promos, self.refresh_promos().await),
            (ContentSection::Streams, self.refresh_streams().await),
            (ContentSection::Podcasts, self.refresh_podcasts().await),
            (
                ContentSection::Categories,
                self.refresh_categories(categories, per_page).await,
            ),
            (ContentSection::NowPlaying, self.refresh_now_playing().await),
        ];

        let updated = report
            .iter()
            .filter(|(_, outcome)| *outcome == RefreshOutcome::Updated)
            .count();
        info!(updated, total = report.len(), "Content refresh completed");
        report
    }
}
