use crate::catalog::client::{CatalogClient, ResolvedVersion};
use crate::error::{Result, ShelfError};
use crate::fallback::first_non_empty;
use crate::models::progress::ProgressTracker;
use crate::models::registry::InstallRegistry;
use crate::models::target::{self, TargetMeta};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Type assumed when the catalog doesn't say
pub const FALLBACK_MODEL_TYPE: &str = "Checkpoint";

/// What to install
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    pub version_id: u64,
    /// Accepted for API compatibility; the first listed file always wins
    pub base_model: Option<String>,
    /// Accepted for API compatibility; the first listed file always wins
    pub file_format: Option<String>,
    pub category: Option<String>,
}

impl InstallRequest {
    #[must_use]
    pub fn new(version_id: u64) -> Self {
        Self {
            version_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Resolve -> pick file -> compute path -> stream -> register
pub struct Installer {
    catalog: CatalogClient,
    registry: InstallRegistry,
    progress: Arc<ProgressTracker>,
    models_dir: PathBuf,
    chunk_size: usize,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("models_dir", &self.models_dir)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl Installer {
    #[must_use]
    pub fn new(
        catalog: CatalogClient,
        registry: InstallRegistry,
        progress: Arc<ProgressTracker>,
        models_dir: impl Into<PathBuf>,
        chunk_size: usize,
    ) -> Self {
        Self {
            catalog,
            registry,
            progress,
            models_dir: models_dir.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Run the whole pipeline; nothing is registered unless the stream completed.
    ///
    /// A failed stream leaves its partial file in place.
    pub fn install(&self, request: &InstallRequest) -> Result<PathBuf> {
        let version_id = request.version_id;
        tracing::info!("Installing version {version_id}");

        let resolved = self.catalog.resolve_version(version_id)?;
        let file = resolved
            .version
            .primary_file()
            .ok_or(ShelfError::NoDownloadableFiles)?;

        let target = target::resolve(
            &self.models_dir,
            &target_meta(&resolved, &file.name, request),
        );
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = self.catalog.download_url(version_id, file);
        tracing::debug!("Downloading {url} -> {}", target.display());

        let stream = self.catalog.transport().open(&url)?;
        let key = version_id.to_string();
        self.progress.begin(&key, stream.content_length.unwrap_or(0));

        let written = self.stream_to_file(&key, stream.body, &target)?;
        self.registry.set(version_id, &target)?;

        tracing::info!(
            "Installed version {version_id} ({}) at {}",
            format_bytes(written),
            target.display()
        );
        Ok(target)
    }

    fn stream_to_file(&self, key: &str, mut body: Box<dyn Read + Send>, target: &Path) -> Result<u64> {
        let mut writer = BufWriter::new(File::create(target)?);
        let mut buf = vec![0u8; self.chunk_size];
        let mut written = 0u64;

        loop {
            let n = match body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // keep what arrived on disk
                    writer.flush()?;
                    return Err(ShelfError::Network(e.to_string()));
                }
            };
            writer.write_all(&buf[..n])?;
            written += n as u64;
            self.progress.advance(key, n as u64);
        }

        writer.flush()?;
        Ok(written)
    }
}

fn target_meta(resolved: &ResolvedVersion, raw_file_name: &str, request: &InstallRequest) -> TargetMeta {
    let version_id = resolved.version.id;
    let fallback_name = format!("catalog_{version_id}");

    TargetMeta {
        model_type: first_non_empty([resolved.model.kind.as_str(), FALLBACK_MODEL_TYPE])
            .unwrap_or_default(),
        base_model: resolved.version.base_model.trim().to_string(),
        model_name: first_non_empty([resolved.model.name.as_str(), fallback_name.as_str()])
            .unwrap_or_default(),
        author: resolved.model.author.clone(),
        category: request.category.clone().unwrap_or_default(),
        raw_file_name: raw_file_name.to_string(),
        version_id,
    }
}

/// Format bytes as human-readable string
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
