use crate::error::Result;
use crate::store::KeyValueStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Version id -> installed file path.
///
/// Every call goes straight to the backing store; nothing is cached.
#[derive(Clone)]
pub struct InstallRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for InstallRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallRegistry").finish_non_exhaustive()
    }
}

impl InstallRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Registered path for a version, if any
    pub fn get(&self, version_id: u64) -> Result<Option<PathBuf>> {
        Ok(self
            .store
            .get(&version_id.to_string())?
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from))
    }

    pub fn set(&self, version_id: u64, path: &std::path::Path) -> Result<()> {
        self.store
            .set(&version_id.to_string(), &path.to_string_lossy())
    }

    pub fn remove(&self, version_id: u64) -> Result<()> {
        self.store.remove(&version_id.to_string())
    }

    /// Registered path, only if the file is still on disk.
    /// A registry that can't be read counts as "not installed".
    #[must_use]
    pub fn installed_path(&self, version_id: u64) -> Option<PathBuf> {
        match self.get(version_id) {
            Ok(path) => path.filter(|p| p.is_file()),
            Err(e) => {
                tracing::warn!("Failed to read install registry: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> InstallRegistry {
        InstallRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_set_get_remove() {
        let registry = registry();
        assert_eq!(registry.get(7).unwrap(), None);

        registry.set(7, std::path::Path::new("/m/loras/a.safetensors")).unwrap();
        assert_eq!(
            registry.get(7).unwrap(),
            Some(PathBuf::from("/m/loras/a.safetensors"))
        );

        registry.remove(7).unwrap();
        assert_eq!(registry.get(7).unwrap(), None);
    }

    #[test]
    fn test_installed_path_requires_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("model.safetensors");
        let registry = registry();

        registry.set(1, &file).unwrap();
        assert!(registry.installed_path(1).is_none());

        fs::write(&file, b"weights").unwrap();
        assert_eq!(registry.installed_path(1), Some(file));
    }

    #[test]
    fn test_persists_as_flat_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("installed.json");
        let registry = InstallRegistry::new(Arc::new(JsonFileStore::new(&path)));

        registry.set(42, std::path::Path::new("/m/vae/x.pt")).unwrap();

        let reopened = InstallRegistry::new(Arc::new(JsonFileStore::new(&path)));
        assert_eq!(reopened.get(42).unwrap(), Some(PathBuf::from("/m/vae/x.pt")));

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["42"], "/m/vae/x.pt");
    }

    #[test]
    fn test_corrupt_store_reads_as_not_installed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("installed.json");
        fs::write(&path, "not json").unwrap();

        let registry = InstallRegistry::new(Arc::new(JsonFileStore::new(&path)));
        assert!(registry.get(1).is_err());
        assert!(registry.installed_path(1).is_none());
    }
}
