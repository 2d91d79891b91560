//! Extension pour intégrer le service de contenu dans hpmconfig
//!
//! Ce module fournit le trait `ContentConfigExt` qui ajoute à
//! `hpmconfig::Config` les réglages de la section `content` : URLs de base,
//! délai des requêtes, catégories mises en avant et période de
//! rafraîchissement du "now playing".
//!
//! # Exemple
//!
//! ```no_run
//! use hpmconfig::get_config;
//! use hpmcontent::ContentConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! let every = config.get_now_playing_poll_interval()?;
//! println!("Polling now-playing every {:?}", every);
//! # Ok(())
//! # }
//! ```

use crate::client::{
    DEFAULT_API_BASE_URL, DEFAULT_ARTICLES_PER_CATEGORY, DEFAULT_CDN_BASE_URL,
    DEFAULT_PRIORITY_PATH, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use anyhow::{anyhow, Result};
use hpmconfig::Config;
use serde_yaml::Value;
use std::time::Duration;

/// Default now-playing refresh period (60 seconds)
pub const DEFAULT_NOW_PLAYING_POLL_SECS: u64 = 60;

/// Trait d'extension pour la section `content` de la configuration
pub trait ContentConfigExt {
    // ========================================================================
    // Endpoints
    // ========================================================================

    fn get_content_cdn_base_url(&self) -> Result<String>;
    fn set_content_cdn_base_url(&self, url: String) -> Result<()>;

    fn get_content_api_base_url(&self) -> Result<String>;
    fn set_content_api_base_url(&self, url: String) -> Result<()>;

    /// Chemin du document "priority" sur le CDN
    fn get_content_priority_path(&self) -> Result<String>;

    /// Délai maximal d'une requête HTTP
    fn get_content_request_timeout(&self) -> Result<Duration>;

    // ========================================================================
    // Articles
    // ========================================================================

    /// Catégories dont on récupère les derniers articles
    ///
    /// Une liste vide signifie : déduire les catégories des articles
    /// prioritaires.
    fn get_featured_categories(&self) -> Result<Vec<i64>>;
    fn set_featured_categories(&self, ids: &[i64]) -> Result<()>;

    fn get_articles_per_category(&self) -> Result<u32>;

    // ========================================================================
    // Now playing
    // ========================================================================

    /// Période de rafraîchissement du "now playing" (défaut 60 s)
    fn get_now_playing_poll_interval(&self) -> Result<Duration>;
    fn set_now_playing_poll_interval(&self, interval: Duration) -> Result<()>;
}

impl ContentConfigExt for Config {
    fn get_content_cdn_base_url(&self) -> Result<String> {
        Ok(self.get_string_or(&["content", "cdn_base_url"], DEFAULT_CDN_BASE_URL))
    }

    fn set_content_cdn_base_url(&self, url: String) -> Result<()> {
        self.set_value(&["content", "cdn_base_url"], Value::String(url))
    }

    fn get_content_api_base_url(&self) -> Result<String> {
        Ok(self.get_string_or(&["content", "api_base_url"], DEFAULT_API_BASE_URL))
    }

    fn set_content_api_base_url(&self, url: String) -> Result<()> {
        self.set_value(&["content", "api_base_url"], Value::String(url))
    }

    fn get_content_priority_path(&self) -> Result<String> {
        Ok(self.get_string_or(&["content", "priority_path"], DEFAULT_PRIORITY_PATH))
    }

    fn get_content_request_timeout(&self) -> Result<Duration> {
        let secs = self.get_u64_or(
            &["content", "request_timeout_secs"],
            DEFAULT_REQUEST_TIMEOUT_SECS,
        );
        if secs == 0 {
            return Err(anyhow!("content.request_timeout_secs must be greater than 0"));
        }
        Ok(Duration::from_secs(secs))
    }

    fn get_featured_categories(&self) -> Result<Vec<i64>> {
        Ok(self.get_i64_list(&["content", "featured_categories"]))
    }

    fn set_featured_categories(&self, ids: &[i64]) -> Result<()> {
        self.set_i64_list(&["content", "featured_categories"], ids)
    }

    fn get_articles_per_category(&self) -> Result<u32> {
        let n = self.get_u64_or(
            &["content", "articles_per_category"],
            DEFAULT_ARTICLES_PER_CATEGORY as u64,
        );
        Ok(u32::try_from(n).unwrap_or(DEFAULT_ARTICLES_PER_CATEGORY).max(1))
    }

    fn get_now_playing_poll_interval(&self) -> Result<Duration> {
        let secs = self.get_u64_or(
            &["content", "now_playing", "poll_interval_secs"],
            DEFAULT_NOW_PLAYING_POLL_SECS,
        );
        if secs == 0 {
            return Err(anyhow!(
                "content.now_playing.poll_interval_secs must be greater than 0"
            ));
        }
        Ok(Duration::from_secs(secs))
    }

    fn set_now_playing_poll_interval(&self, interval: Duration) -> Result<()> {
        self.set_u64(
            &["content", "now_playing", "poll_interval_secs"],
            interval.as_secs().max(1),
        )
    }
}
