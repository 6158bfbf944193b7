pub mod client;
pub mod facets;
pub mod http;
pub mod params;
pub mod search;
pub mod types;

use crate::error::Result;
use std::io::Read;

pub use client::{CatalogClient, ModelIdentity, ResolvedVersion};
pub use facets::{FilterCache, FilterFacets};
pub use http::HttpTransport;
pub use params::SearchQuery;
pub use search::{SearchHit, SearchRequest};
pub use types::{CatalogFile, CatalogItem, ModelVersion};

/// Open download body plus its declared size
pub struct ByteStream {
    /// `Content-Length`, when the server sent one
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("content_length", &self.content_length)
            .field("body", &"Read { ... }")
            .finish()
    }
}

/// Blocking access to the remote catalog
pub trait Transport: Send + Sync {
    /// GET a JSON document. 404 maps to `NotFound`, other failures to `Network`.
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<serde_json::Value>;

    /// Open a streaming GET for a file download
    fn open(&self, url: &str) -> Result<ByteStream>;
}
