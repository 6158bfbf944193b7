//! Route-level search: browse vs. tag-search modes, retries with looser
//! tags, category intersection, format filtering and result shaping.

use crate::catalog::client::CatalogClient;
use crate::catalog::params::{is_wildcard, sort_from_label, SearchQuery};
use crate::catalog::types::CatalogItem;
use crate::error::{Result, ShelfError};
use crate::fallback::try_first;
use crate::models::registry::InstallRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Query string of `GET /search`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub q: String,
    pub limit: u32,
    pub page: u32,
    pub base_model: String,
    pub model_type: String,
    pub file_format: String,
    pub category: String,
    pub sort: String,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            q: String::new(),
            limit: 60,
            page: 1,
            base_model: "Any".to_string(),
            model_type: "Any".to_string(),
            file_format: "Any".to_string(),
            category: "Any".to_string(),
            sort: "Relevance".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HitStats {
    pub downloads: u64,
    pub favorites: u64,
    pub rating: f64,
}

/// One shaped search result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub creator: String,
    pub thumb: String,
    pub default_version_id: Option<u64>,
    pub base_model: String,
    pub file_formats: Vec<String>,
    pub stats: HitStats,
    pub installed: bool,
    pub installed_path: String,
}

impl SearchRequest {
    fn search_mode(&self) -> bool {
        !self.q.trim().is_empty()
    }

    fn category_tag(&self) -> Option<&str> {
        let category = self.category.trim();
        (!is_wildcard(category)).then_some(category)
    }

    /// Tags to try in order: as typed, lowercased, first word
    fn tag_attempts(&self) -> Vec<String> {
        let q = self.q.trim();
        let mut attempts = vec![q.to_string(), q.to_lowercase()];
        if let Some((first, _)) = q.split_once(' ') {
            attempts.push(first.trim().to_string());
        }

        let mut seen = HashSet::new();
        attempts.retain(|t| !t.is_empty() && seen.insert(t.clone()));
        attempts
    }

    fn query_for(&self, tag: Option<&str>) -> SearchQuery {
        SearchQuery {
            query: String::new(),
            model_type: self.model_type.clone(),
            tag: tag.map(str::to_string),
            base_models: if is_wildcard(&self.base_model) {
                Vec::new()
            } else {
                vec![self.base_model.trim().to_string()]
            },
            sort: sort_from_label(&self.sort).unwrap_or_default().to_string(),
            period: if self.search_mode() { "Any" } else { "AllTime" }.to_string(),
            nsfw: false,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Run a search and shape the results
pub fn run(
    client: &CatalogClient,
    registry: &InstallRegistry,
    request: &SearchRequest,
) -> Result<Vec<SearchHit>> {
    let items = fetch_items(client, request)?;
    let wanted_format = request.file_format.trim();

    Ok(items
        .iter()
        .filter(|item| {
            wanted_format.eq_ignore_ascii_case("any")
                || item
                    .file_formats()
                    .iter()
                    .any(|f| f.eq_ignore_ascii_case(wanted_format))
        })
        .map(|item| shape(item, registry))
        .collect())
}

fn fetch_items(client: &CatalogClient, request: &SearchRequest) -> Result<Vec<CatalogItem>> {
    let category = request.category_tag();

    if !request.search_mode() {
        return client.search(&request.query_for(category));
    }

    let found = try_first(request.tag_attempts(), |tag| {
        let mut items = client.search(&request.query_for(Some(&tag)))?;
        if let Some(category) = category {
            let in_category: HashSet<u64> = client
                .search(&request.query_for(Some(category)))?
                .iter()
                .map(|i| i.id)
                .collect();
            items.retain(|i| in_category.contains(&i.id));
        }
        tracing::debug!("Tag attempt '{tag}' matched {} items", items.len());
        Ok::<_, ShelfError>((!items.is_empty()).then_some(items))
    })?;

    Ok(found.unwrap_or_default())
}

fn shape(item: &CatalogItem, registry: &InstallRegistry) -> SearchHit {
    let default_version_id = item.default_version().map(|v| v.id);
    let installed_path = default_version_id
        .and_then(|vid| registry.installed_path(vid))
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    SearchHit {
        id: item.id,
        name: item.name.clone(),
        kind: item.kind.clone(),
        creator: item.creator.display().to_string(),
        thumb: item.thumbnail().to_string(),
        default_version_id,
        base_model: item.base_model().to_string(),
        file_formats: item.file_formats(),
        stats: HitStats {
            downloads: item.stats.download_count,
            favorites: item.stats.favorite_count,
            rating: item.stats.rating,
        },
        installed: !installed_path.is_empty(),
        installed_path,
    }
}
