//! Configuration module for modelshelf
//!
//! Loads config from `$XDG_CONFIG_HOME/modelshelf/config.toml` or `~/.config/modelshelf/config.toml`.
//! Falls back to embedded defaults if file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//!
//! # Example
//!
//! ```no_run
//! use modelshelf::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Catalog API: {}", config.catalog.api_base);
//! println!("Chunk size: {}", config.download.chunk_size);
//! ```

pub mod paths;
pub mod schema;

pub use paths::Layout;
pub use schema::Config;
