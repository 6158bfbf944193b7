use crate::error::{Result, ShelfError};
use std::fs;
use std::path::{Path, PathBuf};

/// Plaintext bearer-token file
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current token, if one is stored and non-empty
    #[must_use]
    pub fn load(&self) -> Option<String> {
        let content = fs::read_to_string(&self.path).ok()?;
        let token = content.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn save(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ShelfError::InvalidInput("Missing token.".to_string()));
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    /// Remove the stored token; absent file is not an error
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.load().is_some()
    }
}
