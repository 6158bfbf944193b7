use crate::catalog::params::SORT_ORDERS;
use crate::catalog::types::CatalogItem;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Filterable dimensions shown to users
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterFacets {
    pub types: Vec<String>,
    pub base_models: Vec<String>,
    pub file_formats: Vec<String>,
    pub categories: Vec<String>,
    pub sort_orders: Vec<String>,
}

/// Response body of `/filters`, also the on-disk cache format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersPayload {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub facets: FilterFacets,
}

impl FiltersPayload {
    #[must_use]
    pub const fn ok(facets: FilterFacets) -> Self {
        Self {
            ok: true,
            error: None,
            facets,
        }
    }

    /// Failure payload: empty facets except categories and sort orders
    #[must_use]
    pub fn failed(error: String, categories: Vec<String>) -> Self {
        Self {
            ok: false,
            error: Some(error),
            facets: FilterFacets {
                categories,
                sort_orders: sort_orders(),
                ..FilterFacets::default()
            },
        }
    }
}

#[must_use]
pub fn sort_orders() -> Vec<String> {
    SORT_ORDERS.iter().map(ToString::to_string).collect()
}

/// Distinct types, base models and file formats across a sample of items
#[must_use]
pub fn derive_facets(items: &[CatalogItem], categories: Vec<String>) -> FilterFacets {
    let mut types = BTreeSet::new();
    let mut bases = BTreeSet::new();
    let mut formats = BTreeSet::new();

    for item in items {
        let kind = item.kind.trim();
        if !kind.is_empty() {
            types.insert(kind.to_string());
        }
        let base = item.base_model().trim();
        if !base.is_empty() {
            bases.insert(base.to_string());
        }
        formats.extend(item.file_formats());
    }

    let mut file_formats: Vec<String> = formats.into_iter().collect();
    file_formats.sort_by_key(|f| f.to_lowercase());

    FilterFacets {
        types: types.into_iter().collect(),
        base_models: bases.into_iter().collect(),
        file_formats,
        categories,
        sort_orders: sort_orders(),
    }
}

/// Facet cache on disk; valid until explicitly refreshed
#[derive(Debug, Clone)]
pub struct FilterCache {
    path: PathBuf,
}

impl FilterCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached payload, only if it was stored from a successful derivation
    #[must_use]
    pub fn load(&self) -> Option<FiltersPayload> {
        if !self.path.exists() {
            return None;
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(crate::error::ShelfError::from)
            .and_then(|content| Ok(serde_json::from_str::<FiltersPayload>(&content)?));

        match parsed {
            Ok(payload) if payload.ok => Some(payload),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable filter cache {}: {e}", self.path.display());
                None
            }
        }
    }

    pub fn save(&self, payload: &FiltersPayload) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(payload)?)?;
        Ok(())
    }
}
