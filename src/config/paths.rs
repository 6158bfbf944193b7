use crate::config::schema::StorageConfig;
use crate::error::{Result, ShelfError};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment override for the host root
pub const ROOT_ENV: &str = "MODELSHELF_ROOT";

/// On-disk layout: the host's `models/` tree plus our own data files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub models_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl Layout {
    /// Layout rooted at `root`, with data stored under `data_dir` or `<root>/modelshelf-data`
    #[must_use]
    pub fn new(root: &Path, data_dir: Option<PathBuf>) -> Self {
        Self {
            models_dir: root.join("models"),
            data_dir: data_dir.unwrap_or_else(|| root.join("modelshelf-data")),
        }
    }

    /// Resolve the layout from env, config, then the current directory's ancestors
    pub fn discover(storage: &StorageConfig) -> Result<Self> {
        let root = std::path::absolute(find_root(storage)?)?;
        tracing::debug!("Using host root {}", root.display());
        Ok(Self::new(&root, storage.data_dir.clone()))
    }

    /// Create the data directory if needed
    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("token.txt")
    }

    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("installed.json")
    }

    #[must_use]
    pub fn filters_cache_path(&self) -> PathBuf {
        self.data_dir.join("filters_cache.json")
    }
}

fn find_root(storage: &StorageConfig) -> Result<PathBuf> {
    if let Ok(env_root) = std::env::var(ROOT_ENV) {
        let trimmed = env_root.trim();
        if !trimmed.is_empty() {
            let p = PathBuf::from(trimmed);
            if p.join("models").is_dir() {
                return Ok(p);
            }
            tracing::warn!("{ROOT_ENV}={trimmed} has no models/ directory, ignoring");
        }
    }

    if let Some(root) = &storage.root {
        if root.join("models").is_dir() {
            return Ok(root.clone());
        }
        tracing::warn!(
            "storage.root {} has no models/ directory, ignoring",
            root.display()
        );
    }

    let cwd = std::env::current_dir()?;
    cwd.ancestors()
        .find(|p| p.join("models").is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            ShelfError::Config(format!(
                "Could not locate a host root with a models/ directory above {}",
                cwd.display()
            ))
        })
}
