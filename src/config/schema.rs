use crate::error::{Result, ShelfError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_route_base")]
    pub route_base: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CatalogConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_download_base")]
    pub download_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    #[serde(default = "default_tag_page_size")]
    pub tag_page_size: u32,
    #[serde(default = "default_facet_sample_size")]
    pub facet_sample_size: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct StorageConfig {
    /// Host root that contains the `models/` directory
    pub root: Option<PathBuf>,
    /// Where the token, registry and filter cache live
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct DownloadConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_bind_address() -> String {
    "127.0.0.1:8189".to_string()
}
fn default_route_base() -> String {
    "/modelshelf".to_string()
}
fn default_api_base() -> String {
    "https://civitai.com/api/v1".to_string()
}
fn default_download_base() -> String {
    "https://civitai.com/api/download/models".to_string()
}
const fn default_timeout_secs() -> u64 {
    30
}
const fn default_search_limit() -> u32 {
    60
}
const fn default_tag_page_size() -> u32 {
    200
}
const fn default_facet_sample_size() -> u32 {
    100
}
const fn default_chunk_size() -> usize {
    1024 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            route_base: default_route_base(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            download_base: default_download_base(),
            timeout_secs: default_timeout_secs(),
            search_limit: default_search_limit(),
            tag_page_size: default_tag_page_size(),
            facet_sample_size: default_facet_sample_size(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CatalogConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from the user config directory, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ShelfError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config)
    } else {
        dirs::config_dir()
            .ok_or_else(|| ShelfError::Config("Could not determine config directory".to_string()))?
    };

    Ok(config_dir.join("modelshelf").join("config.toml"))
}
