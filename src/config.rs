use serde::Deserialize;

use crate::notify::{DEFAULT_ENDPOINT, DEFAULT_FROM};
use crate::rules::store::DEFAULT_RULES_KEY;
use crate::session::DEFAULT_USER_KEY;
use crate::transaction::dataset::{DatasetPreset, PresetSize};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_true() -> bool {
    true
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_api_port(),
            host: default_api_host(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

// ============================================================
// Storage Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub path: Option<String>,
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_rules_key")]
    pub rules_key: String,
    #[serde(default = "default_user_key")]
    pub user_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: None,
            database_url: None,
            max_connections: default_max_connections(),
            rules_key: default_rules_key(),
            user_key: default_user_key(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_rules_key() -> String {
    DEFAULT_RULES_KEY.to_string()
}

fn default_user_key() -> String {
    DEFAULT_USER_KEY.to_string()
}

// ============================================================
// Generator Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    /// Fixed RNG seed. Unset means seeded from entropy.
    pub seed: Option<u64>,
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    #[serde(default = "default_demo_size")]
    pub demo: PresetSize,
    #[serde(default = "default_large_size")]
    pub large: PresetSize,
    /// Upper bound on a requested transaction count.
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            id_prefix: default_id_prefix(),
            demo: default_demo_size(),
            large: default_large_size(),
            max_count: default_max_count(),
        }
    }
}

impl GeneratorConfig {
    pub fn size(&self, preset: DatasetPreset) -> PresetSize {
        match preset {
            DatasetPreset::Demo => self.demo,
            DatasetPreset::Large => self.large,
            DatasetPreset::Custom => preset.default_size(),
        }
    }
}

fn default_id_prefix() -> String {
    "TX".to_string()
}

fn default_demo_size() -> PresetSize {
    DatasetPreset::Demo.default_size()
}

fn default_large_size() -> PresetSize {
    DatasetPreset::Large.default_size()
}

fn default_max_count() -> usize {
    100_000
}

// ============================================================
// Logging / Notify Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_from")]
    pub from: String,
    /// Mail API key. Unset means reports are only logged.
    pub api_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            api_key: None,
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_from() -> String {
    DEFAULT_FROM.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        for (name, size) in [("demo", self.generator.demo), ("large", self.generator.large)] {
            if size.window_days == 0 {
                return Err(eyre::eyre!(
                    "generator.{}.window_days must be at least 1",
                    name
                ));
            }
        }
        if self.generator.max_count == 0 {
            return Err(eyre::eyre!("generator.max_count must be at least 1"));
        }
        for (name, size) in [("demo", self.generator.demo), ("large", self.generator.large)] {
            if size.count > self.generator.max_count {
                return Err(eyre::eyre!(
                    "generator.{}.count exceeds generator.max_count ({})",
                    name,
                    self.generator.max_count
                ));
            }
        }
        if self.generator.id_prefix.trim().is_empty() {
            return Err(eyre::eyre!("generator.id_prefix must not be empty"));
        }
        match self.storage.backend {
            StorageBackend::Postgres if self.storage.database_url.is_none() => {
                return Err(eyre::eyre!(
                    "storage.database_url is required for the postgres backend"
                ));
            }
            StorageBackend::File if self.storage.path.is_none() => {
                return Err(eyre::eyre!("storage.path is required for the file backend"));
            }
            _ => {}
        }
        if let Some(key) = &self.notify.api_key {
            if key.trim().is_empty() {
                return Err(eyre::eyre!("notify.api_key must not be empty when set"));
            }
            if self.notify.endpoint.trim().is_empty() {
                return Err(eyre::eyre!("notify.endpoint is required when notify.api_key is set"));
            }
        }
        if self.storage.rules_key == self.storage.user_key {
            return Err(eyre::eyre!(
                "storage.rules_key and storage.user_key must differ"
            ));
        }
        Ok(())
    }
}
