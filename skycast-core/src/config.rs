use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use url::Url;

use crate::provider::ProviderId;

const DEFAULT_REDIS_ADDR: &str = "127.0.0.1:6379";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Where the shared weather cache lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// `host:port` of the redis server.
    pub redis_addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_password: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { redis_addr: DEFAULT_REDIS_ADDR.to_string(), redis_password: None }
    }
}

impl CacheConfig {
    /// Connection URL for the redis client, database 0.
    pub fn redis_url(&self) -> Result<String> {
        let mut url = Url::parse(&format!("redis://{}/0", self.redis_addr))
            .with_context(|| format!("Invalid redis address: {}", self.redis_addr))?;

        if let Some(password) = self.redis_password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|()| anyhow!("Cannot set password on redis URL"))?;
        }

        Ok(url.into())
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// [`Config::load`] followed by environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut cfg = Self::load()?;
        cfg.apply_overrides(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Overlay values from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for &id in ProviderId::all() {
            if let Some(key) = get(id.env_var()) {
                self.providers.insert(id.as_str().to_string(), ProviderConfig { api_key: key });
            }
        }

        if let Some(addr) = get("REDIS_ADDR") {
            self.cache.redis_addr = addr;
        }
        if let Some(password) = get("REDIS_PASSWORD") {
            self.cache.redis_password = Some(password);
        }
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present and not blank.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn set_api_key_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());

        let key = cfg.provider_api_key(ProviderId::OpenWeather);
        assert_eq!(key, Some("OPEN_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::OpenWeather));
        assert!(!cfg.is_provider_configured(ProviderId::WeatherApi));
    }

    #[test]
    fn blank_key_is_not_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "  ".into());

        assert!(cfg.providers.contains_key("weatherapi"));
        assert!(!cfg.is_provider_configured(ProviderId::WeatherApi));
    }

    #[test]
    fn env_overrides_file_values_and_skips_empty() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "FROM_FILE".into());

        let env: HashMap<&str, &str> = [
            ("OPENWEATHERMAP_ORG_API_KEY", ""),
            ("WEATHERAPI_COM_API_KEY", "FROM_ENV"),
            ("REDIS_ADDR", "redis:6379"),
            ("REDIS_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();

        cfg.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("FROM_FILE"));
        assert_eq!(cfg.provider_api_key(ProviderId::WeatherApi), Some("FROM_ENV"));
        assert_eq!(cfg.cache.redis_addr, "redis:6379");
        assert_eq!(cfg.cache.redis_password.as_deref(), Some("secret"));
    }

    #[test]
    fn redis_url_embeds_encoded_password() {
        let cache = CacheConfig {
            redis_addr: "cache.local:6380".into(),
            redis_password: Some("p@ss word".into()),
        };

        assert_eq!(cache.redis_url().unwrap(), "redis://:p%40ss%20word@cache.local:6380/0");
    }

    #[test]
    fn redis_url_without_password() {
        assert_eq!(CacheConfig::default().redis_url().unwrap(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn save_and_load_roundtrip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "WA".into());
        cfg.cache.redis_addr = "10.0.0.5:6379".into();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.provider_api_key(ProviderId::WeatherApi), Some("WA"));
        assert_eq!(loaded.cache.redis_addr, "10.0.0.5:6379");
        assert!(loaded.cache.redis_password.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert!(cfg.providers.is_empty());
        assert_eq!(cfg.cache.redis_addr, DEFAULT_REDIS_ADDR);
    }
}
