//! Error types for the HPM content client

/// Result type alias for content service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the content service
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The service answered with a non-success status
    #[error("API error: {0}")]
    ApiError(String),

    /// Podcast not present in the current podcast list
    #[error("Podcast not found: {0}")]
    PodcastNotFound(i64),

    /// Podcast has no JSON episode feed
    #[error("Podcast {0} has no episode feed")]
    NoEpisodeFeed(i64),

    /// Configuration error (from hpmconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl Error {
    /// Create an API error
    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::ApiError(msg.into())
    }
}
