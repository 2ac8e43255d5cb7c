//! Application configuration management.
//!
//! Holds the backend address, timeouts, the freshness threshold and the
//! ordered endpoint conventions to try.
//!
//! Configuration is stored at `~/.config/mileage-tracker/config.json`;
//! `MILEAGE_API_BASE_URL` overrides the stored base address.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{BodyEncoding, RouteStyle};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "mileage-tracker";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const BASE_URL_ENV: &str = "MILEAGE_API_BASE_URL";

fn default_request_timeout_ms() -> u64 {
    25_000
}

fn default_fresh_after_secs() -> u64 {
    20
}

fn default_warm_up_timeout_ms() -> u64 {
    4_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_fresh_after_secs")]
    pub fresh_after_secs: u64,
    #[serde(default = "default_warm_up_timeout_ms")]
    pub warm_up_timeout_ms: u64,
    #[serde(default = "RouteStyle::defaults")]
    pub routes: Vec<RouteStyle>,
    #[serde(default = "BodyEncoding::defaults")]
    pub write_encodings: Vec<BodyEncoding>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            fresh_after_secs: default_fresh_after_secs(),
            warm_up_timeout_ms: default_warm_up_timeout_ms(),
            routes: RouteStyle::defaults(),
            write_encodings: BodyEncoding::defaults(),
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load from disk (defaults if absent) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                debug!(url = %url, "Using API base URL from environment");
                self.api_base_url = Some(url.trim().to_string());
            }
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn fresh_after(&self) -> Duration {
        Duration::from_secs(self.fresh_after_secs)
    }

    pub fn warm_up_timeout(&self) -> Duration {
        Duration::from_millis(self.warm_up_timeout_ms)
    }
}
