//! Client configuration stored in ~/.cricknet/config.json.
//!
//! Every field carries a serde default, so a missing or partial file still
//! yields a usable config. A handful of environment variables override the
//! file for deployments and the auth emulator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::retry::RetryPolicy;

pub const ENV_API_URL: &str = "CRICKNET_API_URL";
pub const ENV_FIREBASE_API_KEY: &str = "CRICKNET_FIREBASE_API_KEY";
pub const ENV_AUTH_EMULATOR_HOST: &str = "CRICKNET_AUTH_EMULATOR_HOST";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    NoHomeDir,
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid API base URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

fn default_api_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            firebase: FirebaseConfig::default(),
            retry: RetryPolicy::default(),
            connectivity: ConnectivityConfig::default(),
        }
    }
}

/// Static identity-provider bundle. Shipped with the client, not a secret.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub auth_domain: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub storage_bucket: String,
    #[serde(default)]
    pub messaging_sender_id: String,
    #[serde(default)]
    pub app_id: String,
    /// `host:port` of a local auth emulator; when set, all identity calls go there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulator_host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityConfig {
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Upper bound on waiting for the provider's cached session at startup.
    #[serde(default = "default_session_resolution_timeout_ms")]
    pub session_resolution_timeout_ms: u64,
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_session_resolution_timeout_ms() -> u64 {
    3_000
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            session_resolution_timeout_ms: default_session_resolution_timeout_ms(),
        }
    }
}

impl ConnectivityConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    pub fn session_resolution_timeout(&self) -> Duration {
        Duration::from_millis(self.session_resolution_timeout_ms)
    }
}

impl Config {
    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(key) = lookup(ENV_FIREBASE_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.firebase.api_key = key.trim().to_string();
        }
        if let Some(host) = lookup(ENV_AUTH_EMULATOR_HOST).filter(|v| !v.trim().is_empty()) {
            self.firebase.emulator_host = Some(host.trim().to_string());
        }
    }

    /// Parsed API base URL. Always ends with `/` so relative joins keep any path prefix.
    pub fn api_base(&self) -> Result<url::Url, ConfigError> {
        let raw = if self.api_base_url.ends_with('/') {
            self.api_base_url.clone()
        } else {
            format!("{}/", self.api_base_url)
        };
        let parsed = url::Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
            url: self.api_base_url.clone(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: self.api_base_url.clone(),
                reason: "not a base URL".to_string(),
            });
        }
        Ok(parsed)
    }
}

/// ~/.cricknet, the client's state directory.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".cricknet"))
}

/// Get the canonical config file path (~/.cricknet/config.json)
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(state_dir()?.join("config.json"))
}

/// Load config from the canonical path with environment overrides applied.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path()?;
    let mut config = load_config_from(&path)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Load config from `path`. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    config.api_base()?;
    Ok(config)
}

/// Write config to `path` atomically, creating the parent directory if needed.
pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(config)?;
    crate::util::atomic_write_str(path, &content)?;
    Ok(())
}
