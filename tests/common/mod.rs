#![allow(dead_code)]

use modelshelf::catalog::{ByteStream, Transport};
use modelshelf::config::{Config, Layout};
use modelshelf::models::Library;
use modelshelf::store::MemoryStore;
use modelshelf::{Result, ShelfError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const API: &str = "https://civitai.com/api/v1";
pub const DOWNLOAD: &str = "https://civitai.com/api/download/models";

/// In-memory catalog: JSON by URL, `/models` pages by tag, bodies by URL
#[derive(Default)]
pub struct FakeCatalog {
    json: HashMap<String, Value>,
    searches: HashMap<String, Value>,
    bodies: HashMap<String, (Vec<u8>, Option<u64>)>,
    broken: HashMap<String, (Vec<u8>, Option<u64>)>,
    failing_search: Option<String>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, url: &str, value: Value) -> Self {
        self.json.insert(url.to_string(), value);
        self
    }

    /// `/models` response for a tag; `""` means no tag
    pub fn with_search(mut self, tag: &str, items: Value) -> Self {
        self.searches
            .insert(tag.to_string(), json!({ "items": items, "metadata": {} }));
        self
    }

    pub fn with_failing_search(mut self, message: &str) -> Self {
        self.failing_search = Some(message.to_string());
        self
    }

    pub fn with_body(mut self, url: &str, body: &[u8], declared: Option<u64>) -> Self {
        self.bodies
            .insert(url.to_string(), (body.to_vec(), declared));
        self
    }

    /// Body that yields `prefix` and then fails with a connection reset
    pub fn with_broken_body(mut self, url: &str, prefix: &[u8], declared: Option<u64>) -> Self {
        self.broken
            .insert(url.to_string(), (prefix.to_vec(), declared));
        self
    }

    pub fn with_version(self, version: Value) -> Self {
        let id = version["id"].as_u64().unwrap();
        self.with_json(&format!("{API}/model-versions/{id}"), version)
    }

    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().unwrap().clone()
    }

    /// Query pairs of every `/models` request
    pub fn search_requests(&self) -> Vec<Vec<(String, String)>> {
        self.requests()
            .into_iter()
            .filter(|(url, _)| url == &format!("{API}/models"))
            .map(|(_, pairs)| pairs)
            .collect()
    }
}

impl Transport for FakeCatalog {
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), query.to_vec()));

        if url == format!("{API}/models") {
            if let Some(message) = &self.failing_search {
                return Err(ShelfError::Network(message.clone()));
            }
            let tag = query
                .iter()
                .find(|(k, _)| k == "tag")
                .map_or("", |(_, v)| v.as_str());
            return Ok(self
                .searches
                .get(tag)
                .cloned()
                .unwrap_or_else(|| json!({ "items": [] })));
        }

        self.json
            .get(url)
            .cloned()
            .ok_or_else(|| ShelfError::NotFound(url.to_string()))
    }

    fn open(&self, url: &str) -> Result<ByteStream> {
        self.requests.lock().unwrap().push((url.to_string(), vec![]));
        if let Some((prefix, declared)) = self.broken.get(url).cloned() {
            return Ok(ByteStream {
                content_length: declared,
                body: Box::new(Cursor::new(prefix).chain(ResetReader)),
            });
        }
        let (body, declared) = self
            .bodies
            .get(url)
            .cloned()
            .ok_or_else(|| ShelfError::Network(format!("404 Not Found for url ({url})")))?;
        Ok(ByteStream {
            content_length: declared,
            body: Box::new(Cursor::new(body)),
        })
    }
}

struct ResetReader;

impl Read for ResetReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))
    }
}

/// Library over a temp host root with a fake catalog and in-memory registry
pub struct Harness {
    pub temp_dir: TempDir,
    pub catalog: Arc<FakeCatalog>,
    pub store: Arc<MemoryStore>,
    pub library: Arc<Library>,
}

impl Harness {
    pub fn new(catalog: FakeCatalog) -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("models")).unwrap();

        let mut config = Config::default();
        config.download.chunk_size = 4;

        let catalog = Arc::new(catalog);
        let store = Arc::new(MemoryStore::new());
        let layout = Layout::new(temp_dir.path(), None);
        let library = Library::new(&config, layout, catalog.clone(), store.clone());

        Self {
            temp_dir,
            catalog,
            store,
            library: Arc::new(library),
        }
    }

    pub fn models_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("models")
    }
}

/// Version payload with one file and an embedded model summary
pub fn version(id: u64, file_name: &str, kind: &str) -> Value {
    json!({
        "id": id,
        "modelId": id * 10,
        "baseModel": "SD 1.5",
        "files": [{ "name": file_name, "downloadUrl": format!("{DOWNLOAD}/{id}?type=Model") }],
        "model": { "name": "My Model", "type": kind, "creator": { "username": "jdoe" } }
    })
}

/// Search item with a default version
pub fn item(id: u64, version_id: u64, file_name: &str, format: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Model {id}"),
        "type": "LORA",
        "creator": { "username": "jdoe" },
        "stats": { "downloadCount": 10, "favoriteCount": 2, "rating": 4.5 },
        "images": [{ "url": format!("https://img/{id}.png") }],
        "modelVersions": [{
            "id": version_id,
            "baseModel": "SDXL 1.0",
            "files": [{ "name": file_name, "metadata": { "format": format } }]
        }]
    })
}
