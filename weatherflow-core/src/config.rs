use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::{location::LocationsConfig, store::StoreBackend};

/// Environment variables recognised on top of the config file.
pub mod env {
    pub const API_KEY: &str = "API_KEY";
    pub const STORE_ACCESS_KEY: &str = "STORE_ACCESS_KEY";
    pub const STORE_SECRET_KEY: &str = "STORE_SECRET_KEY";
    pub const STORE_SESSION_TOKEN: &str = "STORE_SESSION_TOKEN";
    pub const STORE_BUCKET: &str = "STORE_BUCKET";
    pub const STORE_BACKEND: &str = "STORE_BACKEND";
    pub const STORE_REGION: &str = "STORE_REGION";
    pub const STORE_ENDPOINT: &str = "STORE_ENDPOINT";
    pub const STORE_ROOT: &str = "STORE_ROOT";
}

pub const DEFAULT_WEATHER_API_URL: &str = "http://api.weatherapi.com/v1";

/// WeatherAPI.com credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self { api_key: None, base_url: DEFAULT_WEATHER_API_URL.to_string() }
    }
}

/// Blob store selection and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Bucket name (`s3`).
    pub bucket: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Set alongside temporary (STS) keys.
    pub session_token: Option<String>,
    pub region: String,
    /// Override for S3-compatible services; defaults to AWS for `region`.
    pub endpoint: Option<String>,
    /// Root directory (`local`).
    pub root: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            bucket: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            root: None,
        }
    }
}

/// Bind address of the dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8501 }
    }
}

/// Top-level configuration.
///
/// Example TOML:
/// ```toml
/// [weather]
/// api_key = "..."
///
/// [store]
/// backend = "s3"
/// bucket = "weather-data"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub weather: WeatherApiConfig,
    pub store: StoreConfig,
    pub locations: LocationsConfig,
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Load the config file (default location unless `path` is given), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        let mut cfg = Self::load_file(&path)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Load a config file, or return defaults if it doesn't exist yet.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
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

    /// Path to the default config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherflow", "weatherflow")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(env::API_KEY) {
            self.weather.api_key = Some(v);
        }
        if let Some(v) = get(env::STORE_ACCESS_KEY) {
            self.store.access_key = Some(v);
        }
        if let Some(v) = get(env::STORE_SECRET_KEY) {
            self.store.secret_key = Some(v);
        }
        if let Some(v) = get(env::STORE_SESSION_TOKEN) {
            self.store.session_token = Some(v);
        }
        if let Some(v) = get(env::STORE_BUCKET) {
            self.store.bucket = Some(v);
        }
        if let Some(v) = get(env::STORE_REGION) {
            self.store.region = v;
        }
        if let Some(v) = get(env::STORE_ENDPOINT) {
            self.store.endpoint = Some(v);
        }
        if let Some(v) = get(env::STORE_ROOT) {
            self.store.root = Some(PathBuf::from(v));
        }
        if let Some(v) = get(env::STORE_BACKEND) {
            match StoreBackend::try_from(v.as_str()) {
                Ok(backend) => self.store.backend = backend,
                Err(err) => tracing::warn!("ignoring {}: {err}", env::STORE_BACKEND),
            }
        }
    }

    /// The weather API key, or a hint on how to configure one.
    pub fn api_key(&self) -> Result<&str> {
        self.weather.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No weather API key configured.\n\
                 Hint: set {} or run `weatherflow configure`.",
                env::API_KEY
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.weather.api_key = Some(api_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.api_key().unwrap_err();

        assert!(err.to_string().contains("No weather API key configured"));
        assert!(err.to_string().contains("weatherflow configure"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());
        cfg.store.bucket = Some("file-bucket".into());

        cfg.apply_env_with(lookup(&[
            ("API_KEY", "ENV_KEY"),
            ("STORE_BUCKET", "env-bucket"),
            ("STORE_ACCESS_KEY", "AKIA"),
            ("STORE_SECRET_KEY", "secret"),
            ("STORE_SESSION_TOKEN", "token"),
        ]));

        assert_eq!(cfg.api_key().unwrap(), "ENV_KEY");
        assert_eq!(cfg.store.bucket.as_deref(), Some("env-bucket"));
        assert_eq!(cfg.store.access_key.as_deref(), Some("AKIA"));
        assert_eq!(cfg.store.secret_key.as_deref(), Some("secret"));
        assert_eq!(cfg.store.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());

        cfg.apply_env_with(lookup(&[("API_KEY", "  ")]));

        assert_eq!(cfg.api_key().unwrap(), "FILE_KEY");
    }

    #[test]
    fn backend_can_be_switched_from_env() {
        let mut cfg = Config::default();
        assert_eq!(cfg.store.backend, StoreBackend::S3);

        cfg.apply_env_with(lookup(&[("STORE_BACKEND", "local"), ("STORE_ROOT", "/tmp/wf")]));

        assert_eq!(cfg.store.backend, StoreBackend::Local);
        assert_eq!(cfg.store.root, Some(PathBuf::from("/tmp/wf")));
    }

    #[test]
    fn unknown_backend_in_env_keeps_previous() {
        let mut cfg = Config::default();
        cfg.apply_env_with(lookup(&[("STORE_BACKEND", "ftp")]));
        assert_eq!(cfg.store.backend, StoreBackend::S3);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.store.backend = StoreBackend::Local;
        cfg.store.root = Some(dir.path().join("bucket"));
        cfg.dashboard.port = 9000;
        cfg.save(&path).unwrap();

        let loaded = Config::load_file(&path).unwrap();
        assert_eq!(loaded.weather.api_key.as_deref(), Some("KEY"));
        assert_eq!(loaded.store.backend, StoreBackend::Local);
        assert_eq!(loaded.dashboard.port, 9000);
        assert_eq!(loaded.weather.base_url, DEFAULT_WEATHER_API_URL);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_file(&dir.path().join("absent.toml")).unwrap();

        assert!(cfg.weather.api_key.is_none());
        assert_eq!(cfg.store.region, "us-east-1");
        assert_eq!(cfg.dashboard.port, 8501);
    }
}
