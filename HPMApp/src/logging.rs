//! Initialisation du logging depuis la section `host.logger`

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Result, anyhow};
use hpmconfig::Config;
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

/// Handle on the installed subscriber, used to change the level at runtime.
#[derive(Clone)]
pub struct LogControl {
    level: Arc<RwLock<Level>>,
    reload_handle: reload::Handle<LevelFilter, Registry>,
}

impl LogControl {
    pub fn level(&self) -> Level {
        *self.level.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_level(&self, level: Level) -> Result<()> {
        self.reload_handle
            .reload(LevelFilter::from_level(level))
            .map_err(|e| anyhow!("Failed to reload log level filter: {}", e))?;
        *self.level.write().unwrap_or_else(PoisonError::into_inner) = level;
        Ok(())
    }
}

pub fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

/// Installs the global subscriber: reloadable level filter, then console output.
pub fn init_logging(config: &Config) -> LogControl {
    let level = config
        .get_log_min_level()
        .ok()
        .and_then(|l| parse_level(&l))
        .unwrap_or(Level::INFO);

    let (filter, reload_handle) = reload::Layer::new(LevelFilter::from_level(level));
    let subscriber = Registry::default().with(filter);

    // Le filtre doit précéder la couche de sortie
    if config.get_log_enable_console().unwrap_or(true) {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    } else {
        subscriber.init();
    }

    LogControl {
        level: Arc::new(RwLock::new(level)),
        reload_handle,
    }
}
