//! Where an installed file lands under the host's `models/` tree.
//!
//! Layout: `<type folder>/<base model>/<category>/<model name>/<file>`, with
//! missing parts dropped according to a fixed ladder. Everything here is pure.

use crate::fallback::first_present;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTENSION: &str = ".safetensors";
pub const DEFAULT_SUBFOLDER: &str = "checkpoints";

/// Catalog model type -> folder under `models/`
const TYPE_SUBFOLDERS: &[(&str, &str)] = &[
    ("Checkpoint", "checkpoints"),
    ("LoRA", "loras"),
    ("LORA", "loras"),
    ("TextualInversion", "embeddings"),
    ("Controlnet", "controlnet"),
    ("ControlNet", "controlnet"),
    ("VAE", "vae"),
    ("Upscale", "upscale_models"),
    ("Upscaler", "upscale_models"),
];

/// Catalog metadata feeding the path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetMeta {
    pub model_type: String,
    pub base_model: String,
    pub model_name: String,
    pub author: String,
    pub category: String,
    pub raw_file_name: String,
    pub version_id: u64,
}

/// Reduce a string to a safe folder/file part. Empty result means "absent".
#[must_use]
pub fn sanitize_part(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();

    let mut part = kept.trim().replace(' ', "-");
    while part.contains("--") {
        part = part.replace("--", "-");
    }

    part.trim_matches(|c| matches!(c, '-' | '_' | '.')).to_string()
}

/// Folder for a model type; unknown types go to `checkpoints`
#[must_use]
pub fn subfolder_for(model_type: &str) -> &'static str {
    TYPE_SUBFOLDERS
        .iter()
        .find(|(kind, _)| *kind == model_type.trim())
        .map_or(DEFAULT_SUBFOLDER, |(_, folder)| folder)
}

/// Extension of the raw file name including the dot, default `.safetensors`
#[must_use]
pub fn extension_of(raw_file_name: &str) -> String {
    Path::new(raw_file_name.trim())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map_or_else(|| DEFAULT_EXTENSION.to_string(), |e| format!(".{e}"))
}

fn category_part(category: &str) -> Option<String> {
    let category = category.trim();
    if ["any", "all", "none"]
        .iter()
        .any(|w| category.eq_ignore_ascii_case(w))
    {
        return None;
    }
    present(sanitize_part(category))
}

fn present(part: String) -> Option<String> {
    (!part.is_empty()).then_some(part)
}

/// File name: `Base_Name_Author` plus extension
#[must_use]
pub fn file_name(meta: &TargetMeta) -> String {
    let parts: Vec<String> = [&meta.base_model, &meta.model_name, &meta.author]
        .into_iter()
        .filter_map(|p| present(sanitize_part(p)))
        .collect();

    let stem = if parts.is_empty() {
        first_present([
            present(sanitize_part(&meta.raw_file_name)),
            Some(format!("catalog_{}", meta.version_id)),
        ])
        .unwrap_or_default()
    } else {
        parts.join("_")
    };

    let ext = extension_of(&meta.raw_file_name);
    if stem.to_lowercase().ends_with(&ext.to_lowercase()) {
        stem
    } else {
        format!("{stem}{ext}")
    }
}

/// Rungs of the directory ladder as (base, category, name), deepest first
const LADDER: [(bool, bool, bool); 8] = [
    (true, true, true),
    (true, true, false),
    (true, false, true),
    (true, false, false),
    (false, true, true),
    (false, true, false),
    (false, false, true),
    (false, false, false),
];

/// Deepest directory chain the present parts allow
fn folder_chain(
    base: Option<&str>,
    category: Option<&str>,
    name: Option<&str>,
) -> Vec<String> {
    first_present(LADDER.iter().map(|&(want_base, want_category, want_name)| {
        let rung = [(want_base, base), (want_category, category), (want_name, name)];
        rung.iter()
            .all(|(wanted, part)| !wanted || part.is_some())
            .then(|| {
                rung.iter()
                    .filter(|(wanted, _)| *wanted)
                    .filter_map(|(_, part)| part.map(str::to_string))
                    .collect()
            })
    }))
    .unwrap_or_default()
}

/// Target path for a download under `models_dir`
#[must_use]
pub fn resolve(models_dir: &Path, meta: &TargetMeta) -> PathBuf {
    let base = present(sanitize_part(&meta.base_model));
    let category = category_part(&meta.category);
    let name = present(sanitize_part(&meta.model_name));
    let chain = folder_chain(base.as_deref(), category.as_deref(), name.as_deref());

    let mut target = models_dir.join(subfolder_for(&meta.model_type));
    target.extend(chain);
    target.join(file_name(meta))
}
