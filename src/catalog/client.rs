use crate::catalog::params::SearchQuery;
use crate::catalog::types::{CatalogFile, CatalogItem, ModelVersion, Page, Tag};
use crate::catalog::Transport;
use crate::config::schema::CatalogConfig;
use crate::error::Result;
use crate::fallback::first_non_empty;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;

/// Categories served when the taxonomy endpoint is unusable
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Character",
    "Clothing",
    "Concept",
    "Objects",
    "Poses",
    "Style",
];

/// Name, type and author of the model a version belongs to.
/// Empty strings mean the catalog didn't say.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelIdentity {
    pub name: String,
    pub kind: String,
    pub author: String,
}

impl ModelIdentity {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.kind.is_empty() && !self.author.is_empty()
    }
}

/// A version plus its parent model's identity
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub version: ModelVersion,
    pub model: ModelIdentity,
}

/// Typed client for the catalog REST API
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    api_base: String,
    download_base: String,
    tag_page_size: u32,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api_base", &self.api_base)
            .field("download_base", &self.download_base)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &CatalogConfig) -> Self {
        Self {
            transport,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            download_base: config.download_base.trim_end_matches('/').to_string(),
            tag_page_size: config.tag_page_size,
        }
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Search `/models`; items that fail to decode are skipped
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogItem>> {
        let url = format!("{}/models", self.api_base);
        let value = self.transport.get_json(&url, &query.to_pairs())?;
        let page: Page<serde_json::Value> = serde_json::from_value(value)?;
        Ok(decode_items(page.items))
    }

    /// Fetch a version, backfilling the parent model's identity if the
    /// embedded summary is incomplete. A failed backfill is logged and ignored.
    pub fn resolve_version(&self, version_id: u64) -> Result<ResolvedVersion> {
        let url = format!("{}/model-versions/{version_id}", self.api_base);
        let version: ModelVersion = serde_json::from_value(self.transport.get_json(&url, &[])?)?;

        let embedded = version.model.clone().unwrap_or_default();
        let mut model = ModelIdentity {
            name: embedded.name.trim().to_string(),
            kind: embedded.kind.trim().to_string(),
            author: embedded.creator.display().to_string(),
        };

        let model_id = version.model_id.or(embedded.id);
        if let (false, Some(model_id)) = (model.is_complete(), model_id) {
            match self.fetch_model(model_id) {
                Ok(parent) => {
                    model = ModelIdentity {
                        name: first_non_empty([model.name.as_str(), parent.name.as_str()])
                            .unwrap_or_default(),
                        kind: first_non_empty([model.kind.as_str(), parent.kind.as_str()])
                            .unwrap_or_default(),
                        author: first_non_empty([model.author.as_str(), parent.creator.display()])
                            .unwrap_or_default(),
                    };
                }
                Err(e) => {
                    tracing::warn!("Could not backfill model {model_id} for version {version_id}: {e}");
                }
            }
        }

        Ok(ResolvedVersion { version, model })
    }

    /// Fetch a model record by id
    pub fn fetch_model(&self, model_id: u64) -> Result<CatalogItem> {
        let url = format!("{}/models/{model_id}", self.api_base);
        Ok(serde_json::from_value(self.transport.get_json(&url, &[])?)?)
    }

    /// Category taxonomy, sorted and deduplicated case-insensitively.
    /// Never fails: any problem yields [`DEFAULT_CATEGORIES`].
    #[must_use]
    pub fn fetch_categories(&self) -> Vec<String> {
        match self.try_fetch_categories() {
            Ok(categories) if !categories.is_empty() => categories,
            Ok(_) => {
                tracing::warn!("Catalog returned no categories, using defaults");
                default_categories()
            }
            Err(e) => {
                tracing::warn!("Failed to fetch categories, using defaults: {e}");
                default_categories()
            }
        }
    }

    fn try_fetch_categories(&self) -> Result<Vec<String>> {
        let url = format!("{}/tags", self.api_base);
        let mut names = Vec::new();
        let mut page = 1;
        let mut total_pages = 1;

        while page <= total_pages {
            let query = [
                ("limit".to_string(), self.tag_page_size.to_string()),
                ("page".to_string(), page.to_string()),
            ];
            let data: Page<serde_json::Value> =
                serde_json::from_value(self.transport.get_json(&url, &query)?)?;

            names.extend(
                decode_items::<Tag>(data.items)
                    .into_iter()
                    .filter(|t| t.kind.trim().eq_ignore_ascii_case("category"))
                    .map(|t| t.name.trim().to_string())
                    .filter(|n| !n.is_empty()),
            );

            total_pages = data.metadata.total_pages.unwrap_or(total_pages);
            page += 1;
        }

        let mut seen = HashSet::new();
        names.retain(|n| seen.insert(n.to_lowercase()));
        names.sort_by_key(|n| n.to_lowercase());
        Ok(names)
    }

    /// Explicit file URL, else the conventional per-version endpoint
    #[must_use]
    pub fn download_url(&self, version_id: u64, file: &CatalogFile) -> String {
        file.download_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map_or_else(
                || format!("{}/{version_id}", self.download_base),
                str::to_string,
            )
    }
}

#[must_use]
pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect()
}

fn decode_items<T: DeserializeOwned>(items: Vec<serde_json::Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!("Skipping undecodable catalog entry: {e}");
                None
            }
        })
        .collect()
}
