//! # HPM Configuration Module
//!
//! This module provides configuration management for the HPM player, including:
//! - Loading configuration from YAML files
//! - Merging with the embedded default configuration
//! - Environment variable overrides (`HPM_CONFIG__SECTION__KEY=value`)
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! Crates that consume configuration (content client, player) add their own
//! getters through extension traits implemented on [`Config`].
//!
//! ## Usage
//!
//! ```no_run
//! use hpmconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! config.set_u64(&["player", "detach_grace_secs"], 120)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("hpm.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load HPM configuration"));
}

const ENV_CONFIG_DIR: &str = "HPM_CONFIG";
const ENV_PREFIX: &str = "HPM_CONFIG__";
const CONFIG_DIR_NAME: &str = ".hpm";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Configuration of the HPM player
///
/// A YAML tree kept in memory behind a mutex and written back to
/// `<config_dir>/config.yaml` on every change.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

/// Picks the configuration directory.
///
/// An explicit `directory` wins, then `$HPM_CONFIG`, then an existing `.hpm`
/// in the working directory, then an existing `~/.hpm`. With none of these,
/// `.hpm` is created in the working directory.
fn resolve_config_dir(directory: &str) -> String {
    if !directory.is_empty() {
        return directory.to_string();
    }
    if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
        info!(env_var = ENV_CONFIG_DIR, path = %from_env, "Config directory taken from env");
        return from_env;
    }

    let home = home_dir().map(|home| home.join(CONFIG_DIR_NAME));
    [Some(PathBuf::from(CONFIG_DIR_NAME)), home]
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_dir())
        .map(|found| found.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_DIR_NAME.to_string())
}

/// Creates `dir` if needed and checks that config.yaml can be written there.
fn ensure_writable_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let marker = dir.join(".hpm_write_check");
    fs::write(&marker, b"")?;
    fs::remove_file(&marker)?;
    Ok(())
}

impl Config {
    /// Loads `config.yaml` from the resolved directory over the embedded
    /// defaults, applies `HPM_CONFIG__*` overrides and writes the result back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = resolve_config_dir(directory);
        ensure_writable_dir(Path::new(&config_dir))
            .map_err(|e| anyhow!("Invalid configuration directory {}: {}", config_dir, e))?;
        info!(config_dir = %config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value = lower_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file = %path, "Loaded config file");
            data
        } else {
            info!(config_file = %path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        // Un fichier vide est valide : il ne surcharge rien
        let external_value = lower_keys(serde_yaml::from_slice(&yaml_data)?);
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = default_value;

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Returns the directory this configuration was loaded from
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    fn lock_data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.lock_data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets the value at `path` (e.g. `&["player", "detach_grace_secs"]`)
    /// and saves the file. Missing intermediate sections are created.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        insert_at(&mut self.lock_data(), path, value)?;
        self.save()
    }

    /// Returns the value at `path`, or an error naming the first missing key.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock_data();
        let mut node = &*data;
        for (depth, key) in path.iter().enumerate() {
            node = node
                .as_mapping()
                .and_then(|section| section.get(&Value::String(key.to_lowercase())))
                .ok_or_else(|| anyhow!("No configuration value at {}", path[..=depth].join(".")))?;
        }
        Ok(node.clone())
    }

    /// Reads a string value, falling back to `default` when absent or mistyped
    pub fn get_string_or(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(Value::Null) | Err(_) => default.to_string(),
            Ok(other) => {
                warn!(path = %path.join("."), value = ?other, "Expected a string, using default {}", default);
                default.to_string()
            }
        }
    }

    /// Reads an unsigned integer, accepting numbers and numeric strings
    pub fn get_u64_or(&self, path: &[&str], default: u64) -> u64 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => match n.as_u64() {
                Some(v) => v,
                None => {
                    warn!(path = %path.join("."), "Negative or fractional value, using default {}", default);
                    default
                }
            },
            Ok(Value::String(s)) => s.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!(path = %path.join("."), value = %s, "Invalid number, using default {}", default);
                default
            }),
            _ => default,
        }
    }

    /// Reads a boolean value, falling back to `default`
    pub fn get_bool_or(&self, path: &[&str], default: bool) -> bool {
        match self.get_value(path) {
            Ok(Value::Bool(b)) => b,
            _ => default,
        }
    }

    /// Reads a list of integers. Non-integer entries are skipped.
    pub fn get_i64_list(&self, path: &[&str]) -> Vec<i64> {
        match self.get_value(path) {
            Ok(Value::Sequence(seq)) => seq
                .iter()
                .filter_map(|v| match v {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Stores an unsigned integer value
    pub fn set_u64(&self, path: &[&str], value: u64) -> Result<()> {
        self.set_value(path, Value::Number(Number::from(value)))
    }

    /// Stores a list of integers
    pub fn set_i64_list(&self, path: &[&str], values: &[i64]) -> Result<()> {
        let seq = values
            .iter()
            .map(|v| Value::Number(Number::from(*v)))
            .collect();
        self.set_value(path, Value::Sequence(seq))
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(e) = insert_at(config, &key_path, yaml_value) {
                    warn!(env_var = %key, "Ignoring environment override: {}", e);
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self.get_string_or(&["host", "logger", "min_level"], DEFAULT_LOG_MIN_LEVEL))
    }

    pub fn get_log_enable_console(&self) -> Result<bool> {
        Ok(self.get_bool_or(&["host", "logger", "enable_console"], DEFAULT_LOG_ENABLE_CONSOLE))
    }
}

fn insert_at(node: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((key, rest)) = path.split_first() else {
        *node = value;
        return Ok(());
    };
    let section = node
        .as_mapping_mut()
        .ok_or_else(|| anyhow!("Cannot set {}: parent is not a section", key))?;
    let key = Value::String(key.to_lowercase());
    if rest.is_empty() {
        section.insert(key, value);
        Ok(())
    } else {
        let child = section
            .entry(key)
            .or_insert(Value::Mapping(Mapping::new()));
        insert_at(child, rest, value)
    }
}

/// Keys are matched case-insensitively: every mapping key is stored lower-cased.
fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys).collect()),
        other => other,
    }
}

/// Returns the global configuration instance
///
/// The configuration is lazily loaded on first access, from the directory
/// picked by the `HPM_CONFIG` / `.hpm` / `~/.hpm` lookup.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        // Un document vide ne remplace pas les valeurs par défaut
        (_, Value::Null) => {}
        (d, e) => *d = e.clone(),
    }
}
