//! Extension pour les réglages du lecteur dans hpmconfig
//!
//! Section `player` : politique de reprise d'un flux en direct mis en pause,
//! pas des sauts avant/arrière et délai de grâce avant de relâcher le moteur
//! quand l'application passe en arrière-plan.

use std::time::Duration;

use anyhow::{Result, anyhow};
use hpmconfig::Config;
use serde_yaml::Value;
use tracing::warn;

use crate::coordinator::{CoordinatorOptions, LivePausePolicy};
use crate::engine::DEFAULT_SEEK_INCREMENT;

/// Default time the engine stays attached once backgrounded (5 minutes)
pub const DEFAULT_DETACH_GRACE_SECS: u64 = 300;

pub trait PlayerConfigExt {
    fn get_live_pause_policy(&self) -> Result<LivePausePolicy>;
    fn set_live_pause_policy(&self, policy: LivePausePolicy) -> Result<()>;

    /// Pas des sauts pour les moteurs qui n'en définissent pas
    fn get_skip_increment(&self) -> Result<Duration>;
    fn set_skip_increment(&self, step: Duration) -> Result<()>;

    fn get_detach_grace(&self) -> Result<Duration>;

    /// Options du coordinateur construites depuis la configuration
    fn coordinator_options(&self) -> Result<CoordinatorOptions> {
        Ok(CoordinatorOptions {
            live_pause_policy: self.get_live_pause_policy()?,
        })
    }
}

impl PlayerConfigExt for Config {
    fn get_live_pause_policy(&self) -> Result<LivePausePolicy> {
        let raw = self.get_string_or(
            &["player", "live_pause_policy"],
            &LivePausePolicy::default().to_string(),
        );
        match raw.parse() {
            Ok(policy) => Ok(policy),
            Err(e) => {
                warn!("{}, falling back to {}", e, LivePausePolicy::default());
                Ok(LivePausePolicy::default())
            }
        }
    }

    fn set_live_pause_policy(&self, policy: LivePausePolicy) -> Result<()> {
        self.set_value(
            &["player", "live_pause_policy"],
            Value::String(policy.to_string()),
        )
    }

    fn get_skip_increment(&self) -> Result<Duration> {
        let secs = self.get_u64_or(
            &["player", "skip_increment_secs"],
            DEFAULT_SEEK_INCREMENT.as_secs(),
        );
        if secs == 0 {
            return Err(anyhow!("player.skip_increment_secs must be greater than 0"));
        }
        Ok(Duration::from_secs(secs))
    }

    fn set_skip_increment(&self, step: Duration) -> Result<()> {
        self.set_u64(&["player", "skip_increment_secs"], step.as_secs().max(1))
    }

    fn get_detach_grace(&self) -> Result<Duration> {
        Ok(Duration::from_secs(self.get_u64_or(
            &["player", "detach_grace_secs"],
            DEFAULT_DETACH_GRACE_SECS,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_player_defaults() {
        let (_dir, config) = load();
        assert_eq!(config.get_live_pause_policy().unwrap(), LivePausePolicy::Resume);
        assert_eq!(config.get_skip_increment().unwrap(), Duration::from_secs(15));
        assert_eq!(config.get_detach_grace().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn test_live_pause_policy_roundtrip() {
        let (_dir, config) = load();
        config.set_live_pause_policy(LivePausePolicy::Reload).unwrap();
        assert_eq!(
            config.coordinator_options().unwrap().live_pause_policy,
            LivePausePolicy::Reload
        );
    }

    #[test]
    fn test_unknown_policy_falls_back() {
        let (_dir, config) = load();
        config
            .set_value(
                &["player", "live_pause_policy"],
                Value::String("rewind".into()),
            )
            .unwrap();
        assert_eq!(config.get_live_pause_policy().unwrap(), LivePausePolicy::Resume);
    }

    #[test]
    fn test_zero_skip_rejected() {
        let (_dir, config) = load();
        config.set_u64(&["player", "skip_increment_secs"], 0).unwrap();
        assert!(config.get_skip_increment().is_err());
    }
}
