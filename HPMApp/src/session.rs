//! Application session: content repository, now-playing poller, coordinator
//! and the host-owned engine, tied to the foreground/background lifecycle.
//!
//! Going to the background stops the poller right away but keeps the engine
//! attached for a grace period, so audio started in the foreground keeps
//! reporting its state. Once the grace period is over the coordinator
//! detaches; coming back to the foreground re-attaches and re-seeds from
//! whatever the engine is doing at that moment.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use hpmconfig::Config;
use hpmcontent::{ContentConfigExt, ContentSection, NowPlayingPoller, RefreshOutcome, StationData};
use hpmplayer::{
    CommandOutcome, PlayableItem, PlaybackCoordinator, PlaybackEngine, PlayerConfigExt,
};
use tracing::{debug, info, warn};

pub struct AppSession {
    data: Arc<StationData>,
    poller: NowPlayingPoller,
    coordinator: PlaybackCoordinator,
    engine: Arc<dyn PlaybackEngine>,
    featured_categories: Vec<i64>,
    articles_per_category: u32,
    detach_grace: Duration,
    foreground: bool,
    detach_deadline: Option<Instant>,
}

impl AppSession {
    pub fn new(
        config: &Config,
        data: Arc<StationData>,
        engine: Arc<dyn PlaybackEngine>,
    ) -> Result<Self> {
        let poller = NowPlayingPoller::new(data.clone(), config.get_now_playing_poll_interval()?);
        Ok(Self {
            data,
            poller,
            coordinator: PlaybackCoordinator::new(config.coordinator_options()?),
            engine,
            featured_categories: config.get_featured_categories()?,
            articles_per_category: config.get_articles_per_category()?,
            detach_grace: config.get_detach_grace()?,
            foreground: false,
            detach_deadline: None,
        })
    }

    pub fn data(&self) -> &Arc<StationData> {
        &self.data
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut PlaybackCoordinator {
        &mut self.coordinator
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn detach_deadline(&self) -> Option<Instant> {
        self.detach_deadline
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Starts polling and (re)attaches the engine. Must run inside a Tokio runtime.
    pub fn enter_foreground(&mut self) {
        self.foreground = true;
        self.detach_deadline = None;
        self.coordinator.attach(&self.engine);
        if self.poller.start() {
            debug!("Now-playing polling resumed");
        }
        info!("☀️ Foreground");
    }

    /// Stops polling and arms the detach deadline.
    pub fn enter_background(&mut self, now: Instant) {
        self.foreground = false;
        self.poller.stop();
        self.detach_deadline = Some(now + self.detach_grace);
        info!(
            grace_secs = self.detach_grace.as_secs(),
            "🌙 Background, engine released after grace period"
        );
    }

    /// Detaches once the grace period has elapsed in the background.
    ///
    /// Returns `true` when this call detached the engine.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.detach_deadline {
            Some(deadline) if !self.foreground && now >= deadline => {
                self.detach_deadline = None;
                self.coordinator.detach();
                true
            }
            _ => false,
        }
    }

    // ---------------------------------------------------------------
    // Content
    // ---------------------------------------------------------------

    pub async fn refresh(&self) -> Vec<(ContentSection, RefreshOutcome)> {
        self.data
            .refresh_all(&self.featured_categories, self.articles_per_category)
            .await
    }

    /// Plays the live station `station_id`, with what it is currently airing.
    pub fn play_station(&mut self, station_id: i64) -> Result<CommandOutcome> {
        let station = self
            .data
            .station(station_id)
            .ok_or_else(|| anyhow!("Unknown station {}", station_id))?;
        let now_playing = self.data.now_playing_for(station_id);
        let item = PlayableItem::from_station(&station, now_playing.as_ref());
        Ok(self.coordinator.select_and_play(item, station_id)?)
    }

    /// Plays the `index`-th episode of a podcast, fetching its feed if needed.
    pub async fn play_episode(&mut self, podcast_id: i64, index: usize) -> Result<CommandOutcome> {
        let podcast = self
            .data
            .podcast(podcast_id)
            .ok_or_else(|| anyhow!("Unknown podcast {}", podcast_id))?;

        if self.data.episodes(podcast_id).is_none() {
            self.data.refresh_episodes(podcast_id).await;
        }
        let episodes = self
            .data
            .episodes(podcast_id)
            .ok_or_else(|| anyhow!("No episodes available for {}", podcast.name))?;
        let episode = episodes
            .get(index)
            .ok_or_else(|| anyhow!("{} has no episode #{}", podcast.name, index))?;

        let item = PlayableItem::from_episode(&podcast, episode);
        Ok(self.coordinator.select_and_play(item, episode.id)?)
    }

    /// Stops polling, waits for the poll task and releases the engine.
    pub async fn shutdown(&mut self) {
        self.poller.shutdown().await;
        if let Err(e) = self.engine.stop() {
            warn!("Engine stop failed during shutdown: {}", e);
        }
        self.coordinator.detach();
        info!("Session closed");
    }
}
