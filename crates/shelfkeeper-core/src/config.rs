//! Application configuration management.
//!
//! Configuration is stored at `~/.config/shelfkeeper/config.json`. Values
//! from the environment (or a `.env` file loaded by the binary) override
//! what the file says:
//!
//! - `SHELFKEEPER_API_BASE_URL`
//! - `SHELFKEEPER_API_PATH`
//! - `SHELFKEEPER_USERNAME` / `SHELFKEEPER_PASSWORD` (login form prefill)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiSettings, Credentials};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "shelfkeeper";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "https://ec-course-api.hexschool.io/v2";

/// Sessions last a week unless configured otherwise.
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// Longest configurable session, one year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// 30s allows for slow API responses while failing fast enough for good UX.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE_URL: &str = "SHELFKEEPER_API_BASE_URL";
pub const ENV_API_PATH: &str = "SHELFKEEPER_API_PATH";
pub const ENV_USERNAME: &str = "SHELFKEEPER_USERNAME";
pub const ENV_PASSWORD: &str = "SHELFKEEPER_PASSWORD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub api_path: Option<String>,
    pub last_username: Option<String>,
    pub session_ttl_hours: i64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_path: None,
            last_username: None,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
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

    /// Apply overrides from a key lookup; blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = value(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(path) = value(ENV_API_PATH) {
            self.api_path = Some(path);
        }
    }

    /// Initial login form values from the environment.
    pub fn login_prefill(&self) -> Credentials {
        self.login_prefill_from(|key| std::env::var(key).ok())
    }

    /// The username falls back to the last one that signed in. The
    /// password is never read from the config file.
    pub fn login_prefill_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Credentials {
        let username = lookup(ENV_USERNAME)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.last_username.clone())
            .unwrap_or_default();
        let password = lookup(ENV_PASSWORD).unwrap_or_default();
        Credentials { username, password }
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

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS))
    }

    /// Settings for the HTTP client. Fails when no API path is configured.
    pub fn api_settings(&self) -> Result<ApiSettings> {
        let api_path = self
            .api_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No API path configured; set {}", ENV_API_PATH))?;

        Ok(ApiSettings {
            base_url: self.api_base_url.clone(),
            api_path,
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        })
    }
}
