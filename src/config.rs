//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! API base URL plus the session timing knobs. Values in the file can be
//! overridden through the environment, which is how test rigs and CI
//! point the client at a local server.
//!
//! Configuration is stored at `~/.config/sessionvault/config.json`; the
//! encrypted session cache lives under the platform cache directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::manager::{DEFAULT_FRESHNESS_WINDOW_SECS, DEFAULT_REFRESH_INTERVAL_MS};
use crate::session::SessionSettings;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessionvault";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Encrypted session cache file name
const SESSION_FILE: &str = "session.vault";

/// Environment variable overriding the configured API base URL
const API_URL_ENV: &str = "SESSIONVAULT_API_URL";

/// Default per-request timeout. Long enough for a slow mobile link,
/// short enough that a dead server does not hang the UI.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the API server, e.g. `https://api.example.com`.
    #[serde(default)]
    pub api_base_url: String,
    /// Minimum gap between token refresh attempts, in milliseconds.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Maximum cached-session age before the user payload is refetched,
    /// in seconds.
    #[serde(default = "default_cache_freshness_secs")]
    pub cache_freshness_secs: u64,
    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_cache_freshness_secs() -> u64 {
    DEFAULT_FRESHNESS_WINDOW_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            refresh_interval_ms: default_refresh_interval_ms(),
            cache_freshness_secs: default_cache_freshness_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // A .env file is optional; absence is not an error.
        dotenvy::dotenv().ok();

        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                debug!(url = %url, "API base URL overridden from environment");
                config.api_base_url = url;
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Path of the encrypted session cache file.
    pub fn session_path(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(SESSION_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timing knobs in the form the session manager consumes.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
            freshness_window: Duration::from_secs(self.cache_freshness_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.api_base_url.is_empty());
        assert_eq!(config.refresh_interval_ms, 2000);
        assert_eq!(config.cache_freshness_secs, 300);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_base_url": "https://api.example.com"}"#).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.refresh_interval_ms, 2000);
        assert_eq!(config.cache_freshness_secs, 300);
    }

    #[test]
    fn test_session_settings_conversion() {
        let config = Config {
            refresh_interval_ms: 250,
            cache_freshness_secs: 10,
            ..Default::default()
        };
        let settings = config.session_settings();
        assert_eq!(settings.refresh_interval, Duration::from_millis(250));
        assert_eq!(settings.freshness_window, Duration::from_secs(10));
    }
}
