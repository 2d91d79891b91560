//! HTTP client for the HPM content service
//!
//! The content service is a set of static JSON documents on the CDN (stations,
//! now-playing, home screen priority data) plus a few WordPress REST endpoints
//! (podcasts, promos, category posts). None of them require authentication.
//!
//! # Example
//!
//! ```no_run
//! use hpmcontent::ContentClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ContentClient::new()?;
//!
//!     let streams = client.streams().await?;
//!     for station in &streams.audio {
//!         println!("{} - {}", station.id, station.name);
//!     }
//!
//!     let now = client.now_playing().await?;
//!     if let Some(news) = now.radio_station(0) {
//!         println!("On air: {}", news.display_line());
//!     }
//!     Ok(())
//! }
//! ```

use crate::config_ext::ContentConfigExt;
use crate::error::{Error, Result};
use crate::models::{
    ApiEnvelope, ArticleData, NowPlaying, Podcast, PodcastFeedDetail, PodcastList,
    PriorityArticleData, PromoData, Streams,
};
use hpmconfig::Config;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default CDN base URL (static JSON documents)
pub const DEFAULT_CDN_BASE_URL: &str = "https://cdn.houstonpublicmedia.org";

/// Default WordPress base URL (REST endpoints)
pub const DEFAULT_API_BASE_URL: &str = "https://www.houstonpublicmedia.org";

/// Default path of the home screen priority document on the CDN
pub const DEFAULT_PRIORITY_PATH: &str = "/assets/promos-test.json";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of posts fetched per category
pub const DEFAULT_ARTICLES_PER_CATEGORY: u32 = 5;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "HPMPlayer/0.1 (hpmcontent)";

const STREAMS_PATH: &str = "/assets/streams.json";
const NOW_PLAYING_PATH: &str = "/assets/nowplay/all.json";
const PODCASTS_PATH: &str = "/wp-json/hpm-podcast/v1/list";
const PROMOS_PATH: &str = "/wp-json/hpm-promos/v1/list";
const POSTS_PATH: &str = "/wp-json/wp/v2/posts/";

/// HPM content service HTTP client
///
/// The client is stateless and does not cache responses. Last-good data is
/// kept by [`crate::StationData`].
#[derive(Debug, Clone)]
pub struct ContentClient {
    client: Client,
    cdn_base_url: String,
    api_base_url: String,
    priority_path: String,
    timeout: Duration,
}

impl ContentClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client from the `content` section of the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder()
            .cdn_base_url(config.get_content_cdn_base_url()?)
            .api_base_url(config.get_content_api_base_url()?)
            .priority_path(config.get_content_priority_path()?)
            .timeout(config.get_content_request_timeout()?)
            .build()
    }

    /// Get the CDN base URL
    pub fn cdn_base_url(&self) -> &str {
        &self.cdn_base_url
    }

    /// Get the WordPress base URL
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn join(base: &str, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "Fetching content document");

        let response = self.client.get(url.clone()).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(Error::api_error(format!(
                "{} returned status: {}",
                url,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ========================================================================
    // CDN documents
    // ========================================================================

    /// Live station list
    pub async fn streams(&self) -> Result<Streams> {
        let url = Self::join(&self.cdn_base_url, STREAMS_PATH)?;
        self.get_json(url).await
    }

    /// Now-playing metadata for every radio and TV channel
    pub async fn now_playing(&self) -> Result<NowPlaying> {
        let url = Self::join(&self.cdn_base_url, NOW_PLAYING_PATH)?;
        self.get_json(url).await
    }

    /// Home screen priority articles, breaking news, talk show and weather
    pub async fn priority_data(&self) -> Result<PriorityArticleData> {
        let url = Self::join(&self.cdn_base_url, &self.priority_path)?;
        let envelope: ApiEnvelope<PriorityArticleData> = self.get_json(url).await?;
        Ok(envelope.data)
    }

    // ========================================================================
    // WordPress endpoints
    // ========================================================================

    /// Podcast shows
    pub async fn podcasts(&self) -> Result<PodcastList> {
        let url = Self::join(&self.api_base_url, PODCASTS_PATH)?;
        let envelope: ApiEnvelope<PodcastList> = self.get_json(url).await?;
        Ok(envelope.data)
    }

    /// In-app promos
    pub async fn promos(&self) -> Result<PromoData> {
        let url = Self::join(&self.api_base_url, PROMOS_PATH)?;
        let envelope: ApiEnvelope<PromoData> = self.get_json(url).await?;
        Ok(envelope.data)
    }

    /// Latest posts of a category
    pub async fn category_articles(&self, category: i64, per_page: u32) -> Result<Vec<ArticleData>> {
        let mut url = Self::join(&self.api_base_url, POSTS_PATH)?;
        url.query_pairs_mut()
            .append_pair("categories", &category.to_string())
            .append_pair("per_page", &per_page.to_string());
        self.get_json(url).await
    }

    /// Episode list of a podcast, read from its JSON feed
    pub async fn podcast_episodes(&self, podcast: &Podcast) -> Result<PodcastFeedDetail> {
        let feed = podcast
            .feed_json()
            .ok_or(Error::NoEpisodeFeed(podcast.id))?;
        let url = Url::parse(feed)?;
        let envelope: ApiEnvelope<PodcastFeedDetail> = self.get_json(url).await?;
        Ok(envelope.data)
    }
}

/// Builder for [`ContentClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    cdn_base_url: String,
    api_base_url: String,
    priority_path: String,
    timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            cdn_base_url: DEFAULT_CDN_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            priority_path: DEFAULT_PRIORITY_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CDN base URL
    pub fn cdn_base_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_base_url = url.into();
        self
    }

    /// Set the WordPress base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Point both the CDN and WordPress base URLs at the same host
    pub fn base_url(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.cdn_base_url(url.clone()).api_base_url(url)
    }

    /// Set the path of the priority document on the CDN
    pub fn priority_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.priority_path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ContentClient> {
        // Valider les URLs de base dès la construction
        Url::parse(&self.cdn_base_url)?;
        Url::parse(&self.api_base_url)?;

        let client = Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()?;

        Ok(ContentClient {
            client,
            cdn_base_url: self.cdn_base_url,
            api_base_url: self.api_base_url,
            priority_path: self.priority_path,
            timeout: self.timeout,
        })
    }
}
