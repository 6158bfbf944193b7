use serde::{Deserialize, Deserializer, Serialize};

/// Treat JSON `null` the same as a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Remote model record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogItem {
    #[serde(deserialize_with = "nullable")]
    pub id: u64,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
    #[serde(deserialize_with = "nullable")]
    pub model_versions: Vec<ModelVersion>,
    #[serde(deserialize_with = "nullable")]
    pub stats: Stats,
    #[serde(deserialize_with = "nullable")]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Creator {
    #[serde(deserialize_with = "nullable")]
    pub username: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
}

/// A release of a model; the unit of install and uninstall
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelVersion {
    #[serde(deserialize_with = "nullable")]
    pub id: u64,
    pub model_id: Option<u64>,
    #[serde(deserialize_with = "nullable")]
    pub base_model: String,
    #[serde(deserialize_with = "nullable")]
    pub files: Vec<CatalogFile>,
    #[serde(deserialize_with = "nullable")]
    pub images: Vec<Image>,
    /// Parent model summary embedded by `/model-versions/{id}`
    pub model: Option<ModelSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSummary {
    pub id: Option<u64>,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub creator: Creator,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogFile {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    pub download_url: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub metadata: FileMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMetadata {
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    #[serde(deserialize_with = "nullable")]
    pub download_count: u64,
    #[serde(deserialize_with = "nullable")]
    pub favorite_count: u64,
    #[serde(deserialize_with = "nullable")]
    pub rating: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    #[serde(deserialize_with = "nullable")]
    pub url: String,
}

/// One page of `/models` or `/tags`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "nullable")]
    pub metadata: PageMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMetadata {
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Tag {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
}

impl Creator {
    /// Display name: username, else name
    #[must_use]
    pub fn display(&self) -> &str {
        if self.username.trim().is_empty() {
            self.name.trim()
        } else {
            self.username.trim()
        }
    }
}

impl CatalogItem {
    /// The first listed version is the item's default
    #[must_use]
    pub fn default_version(&self) -> Option<&ModelVersion> {
        self.model_versions.first()
    }

    #[must_use]
    pub fn base_model(&self) -> &str {
        self.default_version().map_or("", |v| v.base_model.as_str())
    }

    /// First item image, else first image of the default version
    #[must_use]
    pub fn thumbnail(&self) -> &str {
        crate::fallback::first_present([
            self.images.first(),
            self.default_version().and_then(|v| v.images.first()),
        ])
        .map_or("", |img| img.url.as_str())
    }

    /// Formats offered by the default version
    #[must_use]
    pub fn file_formats(&self) -> Vec<String> {
        self.default_version()
            .map(ModelVersion::file_formats)
            .unwrap_or_default()
    }
}

impl ModelVersion {
    /// The first listed file is the download candidate
    #[must_use]
    pub fn primary_file(&self) -> Option<&CatalogFile> {
        self.files.first()
    }

    /// File extensions and declared formats, deduplicated case-insensitively
    #[must_use]
    pub fn file_formats(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.files
            .iter()
            .flat_map(|f| [f.extension(), f.metadata.format.clone()])
            .flatten()
            .map(|fmt| fmt.trim().to_string())
            .filter(|fmt| !fmt.is_empty() && seen.insert(fmt.to_lowercase()))
            .collect()
    }
}

impl CatalogFile {
    /// Lowercase extension without the dot
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(self.name.trim())
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nulls_are_tolerated() {
        let item: CatalogItem = serde_json::from_value(json!({
            "id": 7,
            "name": null,
            "type": "LORA",
            "creator": null,
            "modelVersions": [{ "id": 70, "baseModel": null, "files": null }],
            "stats": { "downloadCount": null, "rating": 4.5 },
        }))
        .unwrap();

        assert_eq!(item.id, 7);
        assert_eq!(item.name, "");
        assert_eq!(item.kind, "LORA");
        assert_eq!(item.default_version().unwrap().id, 70);
        assert!(item.default_version().unwrap().files.is_empty());
        assert_eq!(item.stats.download_count, 0);
    }

    #[test]
    fn test_file_formats_dedup() {
        let version: ModelVersion = serde_json::from_value(json!({
            "id": 1,
            "files": [
                { "name": "a.safetensors", "metadata": { "format": "SafeTensor" } },
                { "name": "b.SafeTensors", "metadata": { "format": "safetensor" } },
                { "name": "c.ckpt", "metadata": {} },
                { "name": "noext" }
            ]
        }))
        .unwrap();

        assert_eq!(
            version.file_formats(),
            vec!["safetensors", "SafeTensor", "ckpt"]
        );
    }

    #[test]
    fn test_thumbnail_falls_back_to_version_images() {
        let item: CatalogItem = serde_json::from_value(json!({
            "id": 1,
            "images": [],
            "modelVersions": [{ "id": 2, "images": [{ "url": "https://img/2.png" }] }]
        }))
        .unwrap();
        assert_eq!(item.thumbnail(), "https://img/2.png");

        assert_eq!(CatalogItem::default().thumbnail(), "");
    }

    #[test]
    fn test_creator_display() {
        let creator = Creator {
            username: String::new(),
            name: "Jane".to_string(),
        };
        assert_eq!(creator.display(), "Jane");
    }

    #[test]
    fn test_page_tolerates_null_and_missing_fields() {
        let page: Page<CatalogItem> =
            serde_json::from_value(json!({ "items": null, "metadata": null })).unwrap();
        assert!(page.items.is_empty());
        assert!(page.metadata.total_pages.is_none());

        let page: Page<CatalogItem> = serde_json::from_value(json!({
            "items": [{ "id": 3, "name": "Three" }],
            "metadata": { "totalPages": 2 }
        }))
        .unwrap();
        assert_eq!(page.items[0].id, 3);
        assert_eq!(page.metadata.total_pages, Some(2));

        let page: Page<serde_json::Value> = serde_json::from_value(json!({})).unwrap();
        assert!(page.items.is_empty());
    }
}
