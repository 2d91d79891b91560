//! Houston Public Media content service client
//!
//! This crate fetches the JSON documents behind the HPM app and keeps the last
//! good copy of each one.
//!
//! # Features
//!
//! - **Content client**: live stations, now-playing, podcasts and their
//!   episode feeds, home screen priority data, promos, category posts
//! - **Stale-tolerant repository**: [`StationData`] keeps serving the previous
//!   data when a refresh fails, starting from the built-in house stations
//! - **Now-playing poller**: cancellable fixed-interval refresh, started and
//!   stopped with the application's foreground state
//! - **Configuration extension**: endpoints and intervals from `hpmconfig`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hpmcontent::{ContentClient, NowPlayingPoller, StationData};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let data = Arc::new(StationData::new(ContentClient::new()?));
//!     data.refresh_all(&[], 5).await;
//!
//!     let mut poller = NowPlayingPoller::new(data.clone(), std::time::Duration::from_secs(60));
//!     poller.start();
//!
//!     let mut updates = data.subscribe_now_playing();
//!     updates.changed().await?;
//!     if let Some(news) = updates.borrow().radio_station(0) {
//!         println!("On air: {}", news.display_line());
//!     }
//!     poller.stop();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config_ext;
pub mod error;
pub mod models;
pub mod poller;
pub mod station_data;

pub use client::{ClientBuilder, ContentClient};
pub use config_ext::ContentConfigExt;
pub use error::{Error, Result};
pub use models::{
    ApiEnvelope, ArticleData, BreakingNews, HpmWeather, ImageCrop, NowPlaying, NowPlayingStation,
    Podcast, PodcastEnclosure, PodcastEpisode, PodcastExternalLinks, PodcastFeedDetail,
    PodcastFeedItems, PodcastImageCrops, PodcastList, PriorityArticle, PriorityArticleData, Promo,
    PromoData, Rendered, Station, Streams, WpCategory,
};
pub use poller::NowPlayingPoller;
pub use station_data::{ContentSection, RefreshOutcome, StationData};
