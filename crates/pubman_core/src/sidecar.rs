//! JSON sidecar files holding per-path attribute history.
//!
//! # Responsibility
//! - Map a tracked path to `<path>.attr.json`.
//! - Read and write `AttributeHistory` documents.
//!
//! # Invariants
//! - Sidecars are the source of truth for attribute history.
//! - Strict reads never mask corrupt content; lenient reads only serve
//!   read-only projections.

use crate::model::attribute::AttributeHistory;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Suffix appended to a tracked path to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".attr.json";

pub type SidecarResult<T> = Result<T, SidecarError>;

#[derive(Debug)]
pub enum SidecarError {
    Io { path: PathBuf, source: io::Error },
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for SidecarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "sidecar io failure at `{}`: {source}", path.display())
            }
            Self::Corrupt { path, source } => {
                write!(f, "corrupt sidecar `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for SidecarError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Corrupt { source, .. } => Some(source),
        }
    }
}

/// Returns the sidecar location for `path`.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(SIDECAR_SUFFIX);
    PathBuf::from(raw)
}

/// Whether `path` names a sidecar file.
pub fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(SIDECAR_SUFFIX))
        .unwrap_or(false)
}

/// Reads the history for `path`. A missing sidecar is an empty history.
pub fn read_history(path: &Path) -> SidecarResult<AttributeHistory> {
    let sidecar = sidecar_path(path);
    let raw = match fs::read_to_string(&sidecar) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(AttributeHistory::default())
        }
        Err(source) => {
            return Err(SidecarError::Io {
                path: sidecar,
                source,
            })
        }
    };
    if raw.trim().is_empty() {
        return Ok(AttributeHistory::default());
    }
    serde_json::from_str(&raw).map_err(|source| SidecarError::Corrupt {
        path: sidecar,
        source,
    })
}

/// Reads the history for `path`, treating unreadable content as empty.
pub fn load_history_lenient(path: &Path) -> AttributeHistory {
    match read_history(path) {
        Ok(history) => history,
        Err(err) => {
            warn!("event=sidecar_read module=sidecar status=error error={err}");
            AttributeHistory::default()
        }
    }
}

/// Writes the full history for `path` as pretty JSON.
pub fn write_history(path: &Path, history: &AttributeHistory) -> SidecarResult<()> {
    let sidecar = sidecar_path(path);
    let payload = serde_json::to_string_pretty(history).map_err(|source| {
        SidecarError::Corrupt {
            path: sidecar.clone(),
            source,
        }
    })?;
    fs::write(&sidecar, payload).map_err(|source| SidecarError::Io {
        path: sidecar,
        source,
    })
}
