mod common;

use common::{version, FakeCatalog, Harness, API, DOWNLOAD};
use modelshelf::models::InstallRequest;
use modelshelf::store::KeyValueStore;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

#[test]
fn test_install_zero_files_fails_without_registering() {
    let harness = Harness::new(FakeCatalog::new().with_version(json!({
        "id": 5,
        "files": [],
        "model": { "name": "Empty", "type": "LORA", "creator": { "username": "x" } }
    })));

    let outcome = harness.library.install(&InstallRequest::new(5));

    assert!(!outcome.ok);
    assert_eq!(
        outcome.error.as_deref(),
        Some("No downloadable files found for this version.")
    );
    assert!(harness.store.is_empty());
}

#[test]
fn test_install_writes_file_and_registers_path() {
    let body = b"0123456789abcdef";
    let harness = Harness::new(
        FakeCatalog::new()
            .with_version(version(42, "myModel.ckpt", "LORA"))
            .with_body(&format!("{DOWNLOAD}/42?type=Model"), body, Some(16)),
    );

    let outcome = harness
        .library
        .install(&InstallRequest::new(42).with_category("Character"));

    assert!(outcome.ok, "install failed: {:?}", outcome.error);
    let path = PathBuf::from(outcome.path.unwrap());
    assert_eq!(
        path,
        harness
            .models_dir()
            .join("loras/SD-1.5/Character/My-Model/SD-1.5_My-Model_jdoe.ckpt")
    );
    assert_eq!(fs::read(&path).unwrap(), body);
    assert_eq!(harness.library.registry().get(42).unwrap(), Some(path));
    assert_eq!(harness.library.progress("42"), 100);
    assert_eq!(harness.library.progress("042"), 100);
}

#[test]
fn test_install_without_content_length_reports_zero_progress() {
    let harness = Harness::new(
        FakeCatalog::new()
            .with_version(version(7, "thing.safetensors", "Checkpoint"))
            .with_body(&format!("{DOWNLOAD}/7?type=Model"), b"abcdefgh", None),
    );

    let outcome = harness.library.install(&InstallRequest::new(7));

    assert!(outcome.ok);
    assert_eq!(harness.library.progress("7"), 0);
    let transfer = harness.library.progress_tracker().snapshot("7").unwrap();
    assert_eq!(transfer.downloaded, 8);
    assert_eq!(transfer.total, 0);
}

#[test]
fn test_install_synthesizes_download_url() {
    let harness = Harness::new(
        FakeCatalog::new()
            .with_version(json!({
                "id": 9,
                "baseModel": "Pony",
                "files": [{ "name": "pony.safetensors" }],
                "model": { "name": "Pony Thing", "type": "Hypernetwork", "creator": { "username": "p" } }
            }))
            .with_body(&format!("{DOWNLOAD}/9"), b"xyz", Some(3)),
    );

    let outcome = harness.library.install(&InstallRequest::new(9));

    assert!(outcome.ok, "install failed: {:?}", outcome.error);
    // unknown types land in checkpoints
    assert!(outcome
        .path
        .unwrap()
        .contains("checkpoints/Pony/Pony-Thing/Pony_Pony-Thing_p.safetensors"));
}

#[test]
fn test_install_backfills_identity_from_model() {
    let harness = Harness::new(
        FakeCatalog::new()
            .with_version(json!({
                "id": 11,
                "modelId": 3,
                "baseModel": "SDXL 1.0",
                "files": [{ "name": "neon.safetensors", "downloadUrl": "https://files/neon" }]
            }))
            .with_json(
                &format!("{API}/models/3"),
                json!({ "id": 3, "name": "Neon Glow", "type": "TextualInversion", "creator": { "username": "ada" } }),
            )
            .with_body("https://files/neon", b"n", Some(1)),
    );

    let outcome = harness.library.install(&InstallRequest::new(11));

    assert!(outcome.ok, "install failed: {:?}", outcome.error);
    assert!(outcome
        .path
        .unwrap()
        .ends_with("embeddings/SDXL-1.0/Neon-Glow/SDXL-1.0_Neon-Glow_ada.safetensors"));
}

#[test]
fn test_install_unknown_version_fails() {
    let harness = Harness::new(FakeCatalog::new());

    let outcome = harness.library.install(&InstallRequest::new(404));

    assert!(!outcome.ok);
    assert!(outcome.error.unwrap().contains("model-versions/404"));
    assert!(harness.store.is_empty());
}

#[test]
fn test_install_stream_failure_registers_nothing() {
    // version resolves, but the download URL has no body
    let harness = Harness::new(FakeCatalog::new().with_version(version(8, "a.ckpt", "LORA")));

    let outcome = harness.library.install(&InstallRequest::new(8));

    assert!(!outcome.ok);
    assert!(outcome.error.unwrap().contains("404"));
    assert!(harness.library.registry().get(8).unwrap().is_none());
}

#[test]
fn test_install_interrupted_mid_stream_keeps_partial_file() {
    let harness = Harness::new(
        FakeCatalog::new()
            .with_version(version(8, "a.ckpt", "LORA"))
            .with_broken_body(&format!("{DOWNLOAD}/8?type=Model"), b"abcd", Some(8)),
    );

    let outcome = harness.library.install(&InstallRequest::new(8));

    assert!(!outcome.ok);
    assert_eq!(outcome.error.as_deref(), Some("connection reset by peer"));
    let partial = harness
        .models_dir()
        .join("loras/SD-1.5/My-Model/SD-1.5_My-Model_jdoe.ckpt");
    assert_eq!(fs::read(&partial).unwrap(), b"abcd");
    assert!(harness.store.is_empty());
    assert_eq!(harness.library.progress("8"), 50);
}

#[test]
fn test_uninstall_without_entry_succeeds() {
    let harness = Harness::new(FakeCatalog::new());

    let outcome = harness.library.uninstall(123);

    assert!(outcome.ok);
    assert!(outcome.error.is_none());
    assert!(harness.library.registry().get(123).unwrap().is_none());
}

#[test]
fn test_uninstall_removes_file_and_entry() {
    let harness = Harness::new(FakeCatalog::new());
    let file = harness.models_dir().join("loras/a.safetensors");
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(&file, b"weights").unwrap();
    harness.library.registry().set(1, &file).unwrap();

    let outcome = harness.library.uninstall(1);

    assert!(outcome.ok);
    assert!(!file.exists());
    assert!(harness.store.get("1").unwrap().is_none());
}

#[test]
fn test_uninstall_with_missing_file_clears_entry() {
    let harness = Harness::new(FakeCatalog::new());
    let gone = harness.models_dir().join("vae/gone.pt");
    harness.library.registry().set(2, &gone).unwrap();

    let outcome = harness.library.uninstall(2);

    assert!(outcome.ok);
    assert!(harness.store.is_empty());
}

#[test]
fn test_uninstall_delete_failure_still_drops_entry() {
    let harness = Harness::new(FakeCatalog::new());
    // a directory at the registered path makes remove_file fail
    let blocker = harness.models_dir().join("loras/locked.safetensors");
    fs::create_dir_all(&blocker).unwrap();
    harness.library.registry().set(3, &blocker).unwrap();

    let outcome = harness.library.uninstall(3);

    assert!(!outcome.ok);
    assert!(outcome.error.unwrap().starts_with("Failed to remove file:"));
    assert!(blocker.exists());
    assert!(harness.library.registry().get(3).unwrap().is_none());
}

#[test]
fn test_reinstall_overwrites_and_keeps_single_entry() {
    let url = format!("{DOWNLOAD}/42?type=Model");
    let harness = Harness::new(
        FakeCatalog::new()
            .with_version(version(42, "m.safetensors", "LoRA"))
            .with_body(&url, b"v1v1", Some(4)),
    );

    let first = harness.library.install(&InstallRequest::new(42));
    let second = harness.library.install(&InstallRequest::new(42));

    assert!(first.ok && second.ok);
    assert_eq!(first.path, second.path);
    assert_eq!(harness.store.len(), 1);
}
