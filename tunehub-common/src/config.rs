//! Configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (the service binary parses these with clap, which also
//!    reads the matching `TUNEHUB_*` environment variable)
//! 2. TOML config file (`--config`, else `~/.config/tunehub/config.toml`)
//! 3. Compiled defaults
//!
//! A missing TOML file at the default location is not an error: defaults apply
//! and the caller logs a warning. A missing `--config` file, or a TOML file that
//! exists but does not parse, is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "TUNEHUB_ROOT_FOLDER";

/// SQLite database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "tunehub.db";

/// Content store directory name inside the root folder
pub const CONTENT_DIR_NAME: &str = "content";

const MIB: u64 = 1024 * 1024;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding the database and content store
    pub root_folder: Option<PathBuf>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub uploads: UploadConfig,
    pub analysis: AnalysisConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8002,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error)
    ///
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Upload payload ceilings
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_audio_bytes: u64,
    pub max_artwork_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_audio_bytes: 50 * MIB,
            max_artwork_bytes: 10 * MIB,
        }
    }
}

impl UploadConfig {
    /// Request body limit for the multipart upload route
    ///
    /// Both payloads plus 1 MiB for form fields and multipart framing.
    pub fn request_body_limit(&self) -> usize {
        (self.max_audio_bytes + self.max_artwork_bytes + MIB) as usize
    }
}

/// Background analysis worker pool settings
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum concurrent analyses
    pub workers: usize,
    /// Per-analysis timeout in seconds, 0 disables
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            timeout_secs: 600,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl TomlConfig {
    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.analysis.workers == 0 {
            return Err(Error::Config(
                "analysis.workers must be at least 1".to_string(),
            ));
        }
        if self.uploads.max_audio_bytes == 0 || self.uploads.max_artwork_bytes == 0 {
            return Err(Error::Config(
                "uploads.max_audio_bytes and uploads.max_artwork_bytes must be non-zero"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file location (`~/.config/tunehub/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunehub").join("config.toml"))
}

/// Parse and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content).map_err(|source| Error::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Where [`load_config`] found its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Nothing at the default location (if one could be determined)
    Defaults(Option<PathBuf>),
}

/// Load configuration, falling back to defaults when no file exists
///
/// `explicit` is the `--config` argument and must exist; without it the
/// platform default location is tried. Nothing is logged here, since this
/// runs before the subscriber is installed: callers report the returned
/// [`ConfigSource`] once logging is up.
pub fn load_config(explicit: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = load_toml_config(path)?;
        return Ok((config, ConfigSource::File(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            Ok((config, ConfigSource::File(path)))
        }
        other => Ok((TomlConfig::default(), ConfigSource::Defaults(other))),
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tunehub"))
        .unwrap_or_else(|| PathBuf::from("./tunehub_data"))
}

/// Where the resolved root folder came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootFolderSource {
    CommandLine,
    Environment,
    TomlConfig,
    CompiledDefault,
}

/// Resolves the root folder: CLI -> `TUNEHUB_ROOT_FOLDER` -> TOML -> default
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml_root(mut self, path: Option<PathBuf>) -> Self {
        self.toml_root = path;
        self
    }

    /// Resolve and report which tier supplied the value
    pub fn resolve_with_source(&self) -> (PathBuf, RootFolderSource) {
        if let Some(path) = &self.cli_arg {
            return (path.clone(), RootFolderSource::CommandLine);
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return (PathBuf::from(path), RootFolderSource::Environment);
            }
        }

        if let Some(path) = &self.toml_root {
            return (path.clone(), RootFolderSource::TomlConfig);
        }

        (default_root_folder(), RootFolderSource::CompiledDefault)
    }

    pub fn resolve(&self) -> PathBuf {
        let (path, source) = self.resolve_with_source();
        info!(
            module = %self.module_name,
            source = ?source,
            "Root folder: {}",
            path.display()
        );
        path
    }
}

/// Creates the root folder layout and derives paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and content directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            info!("Creating root folder: {}", self.root.display());
        }
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.content_root())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE_NAME)
    }

    pub fn content_root(&self) -> PathBuf {
        self.root.join(CONTENT_DIR_NAME)
    }
}
