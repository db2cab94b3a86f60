use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::providers::Provider;

const APP_DIR: &str = "news-harvester";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// One JSON array rewritten on every run.
    #[default]
    #[serde(alias = "flatfile")]
    #[value(alias = "flatfile")]
    Json,
    /// A `news` table in a SQLite database.
    #[serde(alias = "relational")]
    #[value(alias = "relational")]
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Daily run time for external schedulers; not used by the harvester itself.
    #[serde(default = "default_update_time")]
    pub update_time: String,

    #[serde(default)]
    pub api_provider: Provider,

    pub api_key: Option<String>,

    #[serde(default)]
    pub storage_type: StorageType,

    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_json_path")]
    pub json_path: String,

    #[serde(default = "default_request_interval")]
    pub request_interval_ms: u64,
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub keywords: Option<String>,
    pub storage_type: Option<StorageType>,
    pub api_provider: Option<Provider>,
    pub api_key: Option<String>,
}

fn default_keywords() -> Vec<String> {
    ["AI", "人工智能", "机器学习", "深度学习"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_update_time() -> String {
    "09:00".to_string()
}

fn default_max_results() -> u32 {
    20
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_db_path() -> String {
    data_dir().join("news.db").to_string_lossy().to_string()
}

fn default_json_path() -> String {
    data_dir().join("news.json").to_string_lossy().to_string()
}

fn default_request_interval() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            update_time: default_update_time(),
            api_provider: Provider::default(),
            api_key: None,
            storage_type: StorageType::default(),
            max_results: default_max_results(),
            db_path: default_db_path(),
            json_path: default_json_path(),
            request_interval_ms: default_request_interval(),
        }
    }
}

impl Config {
    /// Loads the config at `path`, or the default location when `None`.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            tracing::info!(path = %config_path.display(), "Created default config file");
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// A copy of this config with the command-line values applied.
    pub fn with_overrides(&self, overrides: &Overrides) -> Self {
        let mut config = self.clone();
        if let Some(keywords) = &overrides.keywords {
            config.keywords = keywords.split(',').map(String::from).collect();
        }
        if let Some(storage_type) = overrides.storage_type {
            config.storage_type = storage_type;
        }
        if let Some(provider) = overrides.api_provider {
            config.api_provider = provider;
        }
        if let Some(api_key) = &overrides.api_key {
            config.api_key = Some(api_key.clone());
        }
        config
    }

    /// Keywords trimmed, with empty entries dropped.
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }

    /// Provider key from its environment variable, else from the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        let env_var = self.api_provider.api_key_env();
        if let Ok(key) = std::env::var(env_var) {
            if !key.trim().is_empty() {
                tracing::info!(env_var, "Using API key from environment");
                return Some(key);
            }
        }
        self.api_key.clone().filter(|k| !k.trim().is_empty())
    }
}
