use std::path::Path;
use serde::Deserialize;
use anyhow::{Context, Result};
use parity_discovery::Settings;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub settings: Settings,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8099".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Like [`Config::load`], but a missing file yields the defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parity_discovery::Platform;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.api.listen, "127.0.0.1:8099");
        assert_eq!(config.settings.discovery.probe_timeout_ms, 1000);
        assert_eq!(config.settings.discovery.private_hosts.len(), 9);
        assert_eq!(config.settings.client.timeout_ms, 10_000);
        assert!(config.settings.environment.platform.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [discovery]
            probe_timeout_ms = 1500
            health_path = "/healthz"
            explicit_hosts = ["http://192.168.12.246"]
            private_hosts = []

            [environment]
            platform = "android"
            emulator = true
            debug = true

            [cache]
            db_path = "/tmp/parity/endpoints.db"

            [client]
            timeout_ms = 5000

            [api]
            listen = "0.0.0.0:9000"
            "#,
        )
        .unwrap();

        let settings = &config.settings;
        assert_eq!(settings.discovery.health_path.as_deref(), Some("/healthz"));
        assert!(settings.discovery.private_hosts.is_empty());
        assert_eq!(settings.environment.platform, Some(Platform::Android));
        assert_eq!(settings.environment.emulator, Some(true));
        assert!(settings.environment.dev_wrapper.is_none());
        assert_eq!(settings.cache.db_path.to_str(), Some("/tmp/parity/endpoints.db"));
        assert_eq!(config.api.listen, "0.0.0.0:9000");
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load_or_default("/nonexistent/parity-endpoints.toml").unwrap();
        assert_eq!(config.api.listen, default_listen());
    }
}
