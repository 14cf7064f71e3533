//! Configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "COUGHLAB_ROOT_FOLDER";

/// Default HTTP port for coughlab-ai
pub const DEFAULT_PORT: u16 = 5080;

/// Largest accepted upload (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Subdirectory of the root folder holding saved recordings
pub const RECORDINGS_DIR: &str = "recordings";

/// Prediction mapping file for the JSON cache backend
pub const JSON_STORE_FILE: &str = "predictions_history.json";

/// Database file for the SQLite cache backend
pub const SQLITE_STORE_FILE: &str = "predictions.db";

/// Bootstrap configuration loaded from TOML file
///
/// Read once at startup. Every field is optional in the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root folder for recordings and the prediction cache
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request body limit applied to uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Which prediction cache backend to open
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            cache_backend: CacheBackend::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Prediction cache backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Single JSON mapping file, rewritten atomically on each insert
    #[default]
    Json,
    /// SQLite table with per-key upsert
    Sqlite,
}

impl std::str::FromStr for CacheBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(CacheBackend::Json),
            "sqlite" => Ok(CacheBackend::Sqlite),
            other => Err(Error::Config(format!(
                "Unknown cache backend '{}' (expected 'json' or 'sqlite')",
                other
            ))),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load TOML configuration from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load TOML configuration from the platform location, or defaults if none exists
///
/// A file that exists but does not parse is an error; a missing file is not.
pub fn load_default_config() -> Result<TomlConfig> {
    match find_config_file() {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration file");
            load_toml_config(&path)
        }
        None => {
            tracing::debug!("No configuration file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Locate the platform configuration file
///
/// Checks `<config_dir>/coughlab/config.toml`, then `/etc/coughlab/config.toml`
/// on Linux.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("coughlab").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/coughlab/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Root folder resolution
///
/// 1. Command-line argument
/// 2. Environment variable `env_var_name`
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("coughlab"))
        .unwrap_or_else(|| PathBuf::from("./coughlab_data"))
}

/// Filesystem layout beneath the resolved root folder
#[derive(Debug, Clone)]
pub struct RootFolder {
    root: PathBuf,
}

impl RootFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Directory where uploads are saved
    pub fn recordings_dir(&self) -> PathBuf {
        self.root.join(RECORDINGS_DIR)
    }

    pub fn json_store_path(&self) -> PathBuf {
        self.root.join(JSON_STORE_FILE)
    }

    pub fn sqlite_store_path(&self) -> PathBuf {
        self.root.join(SQLITE_STORE_FILE)
    }

    /// Create the root folder and its recordings directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.recordings_dir())?;
        tracing::debug!(root = %self.root.display(), "Root folder ready");
        Ok(())
    }
}
