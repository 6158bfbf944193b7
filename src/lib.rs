#![allow(clippy::multiple_crate_versions)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod fallback;
pub mod models;
pub mod server;
pub mod store;

pub use error::{Result, ShelfError};
