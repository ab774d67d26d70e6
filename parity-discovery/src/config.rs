use std::path::PathBuf;
use std::time::Duration;
use serde::Deserialize;
use crate::environment::Platform;

const MIN_PROBE_TIMEOUT_MS: u64 = 100;
const MAX_PROBE_TIMEOUT_MS: u64 = 2000;

/// Everything the discovery subsystem needs to be constructed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub environment: EnvironmentOverrides,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Overrides the per-service health path when set
    #[serde(default)]
    pub health_path: Option<String>,

    /// Developer machine addresses, tried ahead of the generic LAN patterns
    #[serde(default = "default_explicit_hosts")]
    pub explicit_hosts: Vec<String>,

    /// Common private-network addresses for same-LAN development
    #[serde(default = "default_private_hosts")]
    pub private_hosts: Vec<String>,
}

/// Optional replacements for individual detection signals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentOverrides {
    pub platform: Option<Platform>,
    pub emulator: Option<bool>,
    pub dev_wrapper: Option<bool>,
    pub debug: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_client_timeout")]
    pub timeout_ms: u64,
}

fn default_probe_timeout() -> u64 {
    1000
}

fn default_explicit_hosts() -> Vec<String> {
    vec![
        "http://192.168.12.246".to_string(),
        "http://192.168.134.197".to_string(),
    ]
}

fn default_private_hosts() -> Vec<String> {
    [
        "192.168.1.100", "192.168.1.101", "192.168.1.102",
        "192.168.0.100", "192.168.0.101", "192.168.0.102",
        "10.0.0.100", "10.0.0.101", "10.0.0.102",
    ]
    .iter()
    .map(|ip| format!("http://{}", ip))
    .collect()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("parity-endpoints.db")
}

fn default_client_timeout() -> u64 {
    10_000
}

impl DiscoveryConfig {
    /// Probe budget, kept short because discovery blocks startup.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(
            self.probe_timeout_ms
                .clamp(MIN_PROBE_TIMEOUT_MS, MAX_PROBE_TIMEOUT_MS),
        )
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout(),
            health_path: None,
            explicit_hosts: default_explicit_hosts(),
            private_hosts: default_private_hosts(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_client_timeout(),
        }
    }
}
