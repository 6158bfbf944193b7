use thiserror::Error;

/// Main error type for modelshelf
#[derive(Error, Debug)]
pub enum ShelfError {
    /// The catalog did not resolve the requested id
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No downloadable files found for this version.")]
    NoDownloadableFiles,

    /// Transport or HTTP status failure, message passed through from the client
    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/modelshelf/config.toml\n- Set MODELSHELF_ROOT to the folder that contains 'models/'\n- Run with RUST_LOG=debug for more details")]
    Config(String),
}

impl ShelfError {
    /// Whether the failure was caused by the caller's input
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<reqwest::Error> for ShelfError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
