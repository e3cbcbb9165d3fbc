//! Application configuration file.
//!
//! # Responsibility
//! - Locate the per-user data directory.
//! - Load `pubman.json`, writing defaults when it is missing or empty.
//!
//! # Invariants
//! - Fields absent from the file fall back to defaults rooted next to the
//!   config file.
//! - A malformed file is reported, never overwritten.

use crate::logging::default_log_level;
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "pubman";
pub const CONFIG_FILE_NAME: &str = "pubman.json";
pub const DB_FILE_NAME: &str = "pubman.sqlite3";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug)]
pub enum ConfigError {
    /// No per-user data directory could be determined.
    NoDataDirectory,
    Io { path: PathBuf, source: io::Error },
    Invalid { path: PathBuf, source: serde_json::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDataDirectory => write!(f, "could not determine a data directory"),
            Self::Io { path, source } => {
                write!(f, "configuration I/O error at `{}`: {source}", path.display())
            }
            Self::Invalid { path, source } => {
                write!(f, "invalid configuration `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoDataDirectory => None,
            Self::Io { source, .. } => Some(source),
            Self::Invalid { source, .. } => Some(source),
        }
    }
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// Password given to `admin` when the database has no users.
    pub default_admin_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    db_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
    default_admin_password: Option<String>,
}

impl AppConfig {
    /// Defaults with every path inside `data_dir`.
    pub fn defaults_in(data_dir: &Path) -> Self {
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            log_dir: data_dir.join("logs"),
            log_level: default_log_level().to_string(),
            default_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }

    fn resolve(file: ConfigFile, data_dir: &Path) -> Self {
        let defaults = Self::defaults_in(data_dir);
        Self {
            db_path: file.db_path.unwrap_or(defaults.db_path),
            log_dir: file.log_dir.unwrap_or(defaults.log_dir),
            log_level: file.log_level.unwrap_or(defaults.log_level),
            default_admin_password: file
                .default_admin_password
                .unwrap_or(defaults.default_admin_password),
        }
    }

    /// Reads `path`, creating it with defaults when missing or blank.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let data_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            let config = Self::defaults_in(&data_dir);
            config.save(path)?;
            info!(
                "event=config_load module=config status=created path={}",
                path.display()
            );
            return Ok(config);
        }

        let file: ConfigFile =
            serde_json::from_str(&text).map_err(|source| ConfigError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            "event=config_load module=config status=ok path={}",
            path.display()
        );
        Ok(Self::resolve(file, &data_dir))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(io_err)
    }
}

/// Platform data directory for pubman.
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDirectory)
}

/// `<data_dir>/pubman.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(default_data_dir()?.join(CONFIG_FILE_NAME))
}
