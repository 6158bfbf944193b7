use crate::catalog::facets::{derive_facets, FilterCache, FiltersPayload};
use crate::catalog::params::{SearchQuery, SORT_NEWEST};
use crate::catalog::search::{self, SearchHit, SearchRequest};
use crate::catalog::{CatalogClient, HttpTransport, Transport};
use crate::config::{Config, Layout};
use crate::error::{Result, ShelfError};
use crate::models::download::{InstallRequest, Installer};
use crate::models::progress::ProgressTracker;
use crate::models::registry::InstallRegistry;
use crate::store::{JsonFileStore, KeyValueStore, TokenStore};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Uniform `{ok, path?, error?}` result of install and uninstall
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether a failure was the caller's fault
    #[serde(skip)]
    pub invalid_input: bool,
}

impl Outcome {
    #[must_use]
    pub const fn done() -> Self {
        Self {
            ok: true,
            path: None,
            error: None,
            invalid_input: false,
        }
    }

    #[must_use]
    pub fn installed(path: &Path) -> Self {
        Self {
            path: Some(path.display().to_string()),
            ..Self::done()
        }
    }

    #[must_use]
    pub fn failed(error: &ShelfError) -> Self {
        Self {
            ok: false,
            path: None,
            error: Some(error.to_string()),
            invalid_input: error.is_invalid_input(),
        }
    }
}

impl From<Result<()>> for Outcome {
    fn from(result: Result<()>) -> Self {
        result.map_or_else(|e| Self::failed(&e), |()| Self::done())
    }
}

/// Body of `/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub ok: bool,
    pub has_token: bool,
    /// Tokens are stored in plaintext
    pub can_encrypt: bool,
}

/// Everything the routes and CLI need, wired from one config.
///
/// All methods block; async callers go through `spawn_blocking`.
pub struct Library {
    layout: Layout,
    catalog: CatalogClient,
    registry: InstallRegistry,
    progress: Arc<ProgressTracker>,
    tokens: TokenStore,
    filter_cache: FilterCache,
    installer: Installer,
    facet_sample_size: u32,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("layout", &self.layout)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl Library {
    /// Wire a library from explicit parts
    pub fn new(
        config: &Config,
        layout: Layout,
        transport: Arc<dyn Transport>,
        registry_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let catalog = CatalogClient::new(transport, &config.catalog);
        let registry = InstallRegistry::new(registry_store);
        let progress = Arc::new(ProgressTracker::new());
        let installer = Installer::new(
            catalog.clone(),
            registry.clone(),
            Arc::clone(&progress),
            layout.models_dir.clone(),
            config.download.chunk_size,
        );

        Self {
            tokens: TokenStore::new(layout.token_path()),
            filter_cache: FilterCache::new(layout.filters_cache_path()),
            layout,
            catalog,
            registry,
            progress,
            installer,
            facet_sample_size: config.catalog.facet_sample_size,
        }
    }

    /// Discover the host layout and wire the real HTTP transport.
    ///
    /// Builds a blocking HTTP client, so call it off the async executor.
    pub fn open(config: &Config) -> Result<Self> {
        let layout = Layout::discover(&config.storage)?;
        layout.ensure_data_dir()?;
        tracing::info!(
            "Models dir {}, data dir {}",
            layout.models_dir.display(),
            layout.data_dir.display()
        );

        let transport = HttpTransport::new(
            TokenStore::new(layout.token_path()),
            config.catalog.timeout(),
        )?;
        let store = JsonFileStore::new(layout.registry_path());

        Ok(Self::new(config, layout, Arc::new(transport), Arc::new(store)))
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn registry(&self) -> &InstallRegistry {
        &self.registry
    }

    /// Shared progress table, for pollers outside the request path
    #[must_use]
    pub fn progress_tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    /// Download and register a version; never returns an error
    pub fn install(&self, request: &InstallRequest) -> Outcome {
        match self.installer.install(request) {
            Ok(path) => Outcome::installed(&path),
            Err(e) => {
                tracing::error!("Install of version {} failed: {e}", request.version_id);
                Outcome::failed(&e)
            }
        }
    }

    /// Delete the file and drop the registry entry.
    ///
    /// The entry is dropped even when deleting the file fails.
    pub fn uninstall(&self, version_id: u64) -> Outcome {
        let outcome = Outcome::from(self.try_uninstall(version_id));
        if let Some(error) = &outcome.error {
            tracing::error!("Uninstall of version {version_id} failed: {error}");
        }
        outcome
    }

    fn try_uninstall(&self, version_id: u64) -> Result<()> {
        if let Some(path) = self.registry.get(version_id)?.filter(|p| p.exists()) {
            if let Err(e) = fs::remove_file(&path) {
                self.registry.remove(version_id)?;
                return Err(ShelfError::Filesystem(std::io::Error::new(
                    e.kind(),
                    format!("Failed to remove file: {e}"),
                )));
            }
            tracing::info!("Removed {}", path.display());
        }

        self.registry.remove(version_id)
    }

    /// Facets, from cache unless `force` or nothing usable is cached
    pub fn filters(&self, force: bool) -> FiltersPayload {
        if !force {
            if let Some(cached) = self.filter_cache.load() {
                return cached;
            }
        }

        let sample = SearchQuery {
            model_type: "Any".to_string(),
            sort: SORT_NEWEST.to_string(),
            period: "AllTime".to_string(),
            page: 1,
            limit: self.facet_sample_size,
            ..SearchQuery::default()
        };

        match self.catalog.search(&sample) {
            Ok(items) => {
                let payload = FiltersPayload::ok(derive_facets(&items, self.catalog.fetch_categories()));
                if let Err(e) = self.filter_cache.save(&payload) {
                    tracing::warn!("Failed to write filter cache: {e}");
                }
                payload
            }
            Err(e) => {
                tracing::warn!("Failed to derive filters: {e}");
                FiltersPayload::failed(e.to_string(), self.catalog.fetch_categories())
            }
        }
    }

    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        search::run(&self.catalog, &self.registry, request)
    }

    #[must_use]
    pub fn status(&self) -> StatusReport {
        StatusReport {
            ok: true,
            has_token: self.tokens.has_token(),
            can_encrypt: false,
        }
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        self.tokens.save(token)
    }

    pub fn clear_token(&self) -> Result<()> {
        self.tokens.clear()
    }

    /// Percent complete for a version id as it appears in the URL
    #[must_use]
    pub fn progress(&self, version_id: &str) -> u8 {
        // entries are keyed by the canonical decimal id
        version_id
            .trim()
            .parse::<u64>()
            .map_or(0, |id| self.progress.query(&id.to_string()))
    }
}
