//! Application configuration management.
//!
//! This module handles loading and saving the configuration: the game's
//! origin, the cache name prefix and version tag, an optional manifest
//! override and optional locations for the cache and a word bank file.
//!
//! Configuration is stored at `~/.config/roommaker/config.json`.
//! `ROOMMAKER_ORIGIN` and `ROOMMAKER_CACHE_VERSION` override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::offline::{Manifest, OfflineConfig};
use crate::wordbank::WordBank;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "roommaker";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_ORIGIN: &str = "http://localhost:5173";

const DEFAULT_CACHE_PREFIX: &str = "room-maker-cache";

/// Bump on every deploy that changes cached assets
const DEFAULT_CACHE_VERSION: &str = "v1";

pub const ENV_ORIGIN: &str = "ROOMMAKER_ORIGIN";
pub const ENV_CACHE_VERSION: &str = "ROOMMAKER_CACHE_VERSION";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub origin: String,
    pub cache_prefix: String,
    pub version: String,
    pub manifest: Option<Manifest>,
    pub cache_dir: Option<PathBuf>,
    pub wordbank_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            version: DEFAULT_CACHE_VERSION.to_string(),
            manifest: None,
            cache_dir: None,
            wordbank_path: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific file, defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(origin) = lookup(ENV_ORIGIN).filter(|v| !v.is_empty()) {
            self.origin = origin;
        }
        if let Some(version) = lookup(ENV_CACHE_VERSION).filter(|v| !v.is_empty()) {
            self.version = version;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the cache buckets
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Name of the current cache bucket, e.g. `room-maker-cache-v1`
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin).with_context(|| format!("Invalid origin: {}", self.origin))
    }

    pub fn offline_config(&self) -> Result<OfflineConfig> {
        Ok(OfflineConfig {
            cache_name: self.cache_name(),
            origin: self.origin_url()?,
            manifest: self.manifest.clone().unwrap_or_default(),
        })
    }

    /// The configured word bank file, or the built-in data set
    pub fn word_bank(&self) -> Result<WordBank> {
        match self.wordbank_path {
            Some(ref path) => WordBank::load(path)
                .with_context(|| format!("Failed to load word bank: {}", path.display())),
            None => Ok(WordBank::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_name() {
        assert_eq!(Config::default().cache_name(), "room-maker-cache-v1");
    }

    #[test]
    fn test_offline_config_defaults() {
        let offline = Config::default().offline_config().expect("default origin parses");
        assert_eq!(offline.cache_name, "room-maker-cache-v1");
        assert_eq!(offline.manifest, Manifest::default());
        assert_eq!(offline.origin.as_str(), "http://localhost:5173/");
    }

    #[test]
    fn test_invalid_origin() {
        let config = Config {
            origin: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.offline_config().is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_ORIGIN => Some("https://rooms.example.com".to_string()),
            ENV_CACHE_VERSION => Some("v7".to_string()),
            _ => None,
        });
        assert_eq!(config.origin, "https://rooms.example.com");
        assert_eq!(config.cache_name(), "room-maker-cache-v7");

        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.cache_name(), "room-maker-cache-v7");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"version": "v2", "manifest": ["/", "/gallery"]}"#)
            .expect("write config");

        let config = Config::load_from(&path).expect("load config");
        assert_eq!(config.cache_name(), "room-maker-cache-v2");
        assert_eq!(config.origin, DEFAULT_ORIGIN);
        assert_eq!(config.manifest, Some(Manifest::new(["/", "/gallery"])));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            cache_dir: Some(dir.path().join("cache")),
            ..Config::default()
        };
        config.save_to(&path).expect("save config");

        let loaded = Config::load_from(&path).expect("reload config");
        assert_eq!(loaded.cache_dir().expect("cache dir"), dir.path().join("cache"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = Config::load_from(&dir.path().join("absent.json")).expect("defaults");
        assert_eq!(config.version, DEFAULT_CACHE_VERSION);
    }

    #[test]
    fn test_word_bank_defaults_to_builtin() {
        let bank = Config::default().word_bank().expect("builtin bank");
        assert_eq!(bank.categories().len(), 4);
    }
}
