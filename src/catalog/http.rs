use crate::catalog::{ByteStream, Transport};
use crate::error::{Result, ShelfError};
use crate::store::TokenStore;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use std::time::Duration;

/// `reqwest::blocking` transport.
///
/// Must be built and used off the async executor threads (e.g. inside
/// `spawn_blocking`). The stored token is re-read on every request.
pub struct HttpTransport {
    client: Client,
    tokens: TokenStore,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("client", &"Client { ... }")
            .field("tokens", &self.tokens.path())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport; `timeout` applies to metadata calls only
    pub fn new(tokens: TokenStore, timeout: Duration) -> Result<Self> {
        // No client-wide timeout: downloads may run for a long time
        let client = Client::builder()
            .user_agent(concat!("modelshelf/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self {
            client,
            tokens,
            timeout,
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.load() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn check_status(url: &str, response: Response) -> Result<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(ShelfError::NotFound(url.to_string())),
        _ => response.error_for_status().map_err(ShelfError::from),
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<serde_json::Value> {
        tracing::debug!("GET {url} {query:?}");

        let response = self
            .authed(self.client.get(url).query(query))
            .timeout(self.timeout)
            .send()?;

        Ok(check_status(url, response)?.json()?)
    }

    fn open(&self, url: &str) -> Result<ByteStream> {
        tracing::debug!("GET (stream) {url}");

        let response = check_status(url, self.authed(self.client.get(url)).send()?)?;

        Ok(ByteStream {
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}
