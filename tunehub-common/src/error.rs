//! Common error types for TuneHub

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for TuneHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or preparing the root folder
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML file exists but could not be parsed
    #[error("Failed to parse {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration value out of range or otherwise unusable
    #[error("Configuration error: {0}")]
    Config(String),
}
